use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use symptriage::ensemble::{ClassifierModel, EnsemblePredictor, LinearModel};
use symptriage::normalizer::{EvidencePolicy, Normalizer, StructuredInput};
use symptriage::schema::{ClassLabelSpace, FeatureSchema};
use symptriage::vote;

const DESCRIPTION: &str = "For the last week I have had a high fever with chills, \
     constant headache, joint pain and muscle pain, plus nausea and a skin rash \
     that started on my arms";

fn linear_model(name: &str, seed: usize, schema: &FeatureSchema, labels: &ClassLabelSpace) -> LinearModel {
    let coefficients = (0..labels.len())
        .map(|c| {
            (0..schema.len())
                .map(|f| (((c * 31 + f * 17 + seed) % 97) as f64 / 97.0) - 0.5)
                .collect()
        })
        .collect();

    LinearModel {
        name: name.to_string(),
        features: schema.identifiers().to_vec(),
        classes: labels.labels().to_vec(),
        coefficients,
        intercepts: vec![0.0; labels.len()],
    }
}

fn bench_normalization(c: &mut Criterion) {
    let schema = Arc::new(FeatureSchema::reference());
    let normalizer = Normalizer::new(schema);

    c.bench_function("direct_pass_reference_schema", |b| {
        b.iter(|| black_box(normalizer.direct_pass(black_box(DESCRIPTION))))
    });
}

fn bench_vote(c: &mut Criterion) {
    let mut group = c.benchmark_group("plurality_vote");
    group.bench_function("four_voters_tied", |b| {
        b.iter(|| black_box(vote::resolve(black_box(&[2, 3, 2, 3]))))
    });

    let wide: Vec<i64> = (0..64).map(|i| (i * 7) % 41).collect();
    group.bench_function("sixty_four_voters", |b| {
        b.iter(|| black_box(vote::resolve(black_box(&wide))))
    });
    group.finish();
}

fn bench_ensemble(c: &mut Criterion) {
    let schema = Arc::new(FeatureSchema::reference());
    let labels = Arc::new(ClassLabelSpace::reference());
    let models: Vec<Arc<dyn ClassifierModel>> = (0..4)
        .map(|i| {
            Arc::new(linear_model(&format!("linear_{}", i), i, &schema, &labels)) as Arc<dyn ClassifierModel>
        })
        .collect();
    let ensemble = EnsemblePredictor::new(schema.clone(), labels, models).unwrap();

    let normalizer = Normalizer::new(schema).with_policy(EvidencePolicy {
        structured: 0,
        free_text: 0,
        voice: 0,
    });
    let picks: StructuredInput = ["high_fever", "chills", "headache", "joint_pain", "nausea"]
        .iter()
        .map(|s| (s.to_string(), 1))
        .collect();
    let vector = normalizer.normalize_structured(&picks).unwrap();

    c.bench_function("ensemble_predict_four_linear", |b| {
        b.iter(|| black_box(ensemble.predict(black_box(&vector)).unwrap()))
    });
}

criterion_group!(benches, bench_normalization, bench_vote, bench_ensemble);
criterion_main!(benches);
