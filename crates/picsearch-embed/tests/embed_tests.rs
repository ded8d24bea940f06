use picsearch_core::config::EmbeddingSettings;
use picsearch_core::traits::Embedder;
use picsearch_embed::{get_default_embedder, FakeEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 384);

    let texts = vec!["a brown dog barking".to_string(), "a brown dog barking".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384, "embedding dim follows settings");
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_bring_texts_closer() {
    let e = FakeEmbedder::new(384);
    let dog = e.embed("brown dog barking").unwrap();
    let query = e.embed("dog barking").unwrap();
    let car = e.embed("red car").unwrap();
    let dist = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>();
    assert!(dist(&query, &dog) < dist(&query, &car));
}
