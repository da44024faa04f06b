use std::path::Path;

use lexrag_core::config::EmbeddingSettings;
use lexrag_embed::get_default_embedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 384, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings, Path::new(".")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 384);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Bit-identical for the same input, across calls too.
    assert_eq!(v1, v2);
    let again = embedder.embed("hello world").expect("embed");
    assert!(v1.iter().zip(again.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn fake_embedder_separates_unrelated_texts() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 4096, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings, Path::new(".")).expect("embedder");
    let q = embedder.embed("elements of negligence").unwrap();
    let near = embedder.embed("Negligence requires duty, breach, causation, and damage.").unwrap();
    let far = embedder.embed("Offer, acceptance and consideration form a contract.").unwrap();
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &near) > dot(&q, &far));
}
