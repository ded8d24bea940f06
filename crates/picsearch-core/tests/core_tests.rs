use std::fs;
use std::path::Path;
use tempfile::TempDir;

use picsearch_core::collaborators::SidecarCaptioner;
use picsearch_core::corpus::CorpusStore;
use picsearch_core::discovery::list_images;
use picsearch_core::traits::Captioner;
use picsearch_core::types::{CorpusVersion, Document};

#[test]
fn discovered_images_become_contiguous_corpus_rows() {
    let tmp = TempDir::new().unwrap();
    let pics = tmp.path().join("pics");
    fs::create_dir_all(pics.join("farm")).unwrap();
    fs::write(pics.join("farm/horse.jpg"), b"").unwrap();
    fs::write(pics.join("farm/horse.txt"), "a horse in a field").unwrap();
    fs::write(pics.join("car.jpg"), b"").unwrap();
    fs::write(pics.join("car.txt"), "a red car").unwrap();

    let exts = vec!["jpg".to_string()];
    let captioner = SidecarCaptioner::new("txt");
    let docs: Vec<Document> = list_images(&pics, &exts)
        .into_iter()
        .enumerate()
        .map(|(i, img)| {
            let caption = captioner.caption(&img.absolute).unwrap();
            Document { id: i as u32, path: img.relative, tokens: caption.split_whitespace().map(str::to_string).collect(), caption, embedding: vec![0.0; 2] }
        })
        .collect();

    let out = tmp.path().join("gen");
    CorpusStore::save(&out, &CorpusVersion::new("v-test"), &pics, 2, &docs).unwrap();
    let table = CorpusStore::load(&out).unwrap();

    let paths: Vec<&str> = table.iter().map(|(_, m)| m.path.as_str()).collect();
    assert_eq!(paths, vec!["car.jpg", "farm/horse.jpg"]);
    assert_eq!(table.get(1).unwrap().caption, "a horse in a field");
    assert!(table.resolve("farm/horse.jpg").starts_with(Path::new(&pics)));
}
