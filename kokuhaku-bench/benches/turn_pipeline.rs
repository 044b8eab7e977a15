//! kokuhaku Benchmark Suite — per-turn pipeline
//!
//! Everything a turn does apart from the model call. Targets:
//!   topic_score ............. < 20μs
//!   repetition_detect ....... < 50μs
//!   prompt_render_full ...... < 200μs
//!   interpret_noisy_reply ... < 50μs
//!   emotion_apply ........... < 1μs

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand::rngs::StdRng;

use kokuhaku_bench::{filled_ledger, warm_vector, NOISY_REPLY, SAMPLE_INPUTS};
use kokuhaku_core::config::GameConfig;
use kokuhaku_core::prompt::{self, PromptContext};
use kokuhaku_core::{emotion, interpret, repetition, topic, Difficulty, EmotionDelta, Roster};

/// Benchmark: keyword scoring against the easy character.
fn bench_topic_score(c: &mut Criterion) {
    let profile = Roster::builtin().get(Difficulty::Easy).expect("easy");
    c.bench_function("topic_score", |b| {
        b.iter(|| topic::score(black_box(SAMPLE_INPUTS[1]), &profile));
    });
}

/// Benchmark: similarity against the default window of a full ledger.
fn bench_repetition(c: &mut Criterion) {
    let config = GameConfig::default();
    let ledger = filled_ledger(config.ledger.max_entries);
    c.bench_function("repetition_detect", |b| {
        b.iter(|| repetition::detect(black_box(SAMPLE_INPUTS[2]), &ledger, &config.repetition));
    });
}

/// Benchmark: full prompt with a full ledger.
fn bench_prompt_render(c: &mut Criterion) {
    let config = GameConfig::default();
    let profile = Roster::builtin().get(Difficulty::Medium).expect("medium");
    let ledger = filled_ledger(config.ledger.max_entries);
    let vector = warm_vector();
    c.bench_function("prompt_render_full", |b| {
        b.iter(|| {
            let rendered = prompt::render(&PromptContext {
                profile: &profile,
                emotions: &vector,
                stage: emotion::stage(&vector),
                ledger: &ledger,
                user_input: black_box("今度一緒に出かけない？"),
                turn: 21,
                history_len: config.ledger.prompt_history,
            });
            black_box(rendered);
        });
    });
}

/// Benchmark: tag extraction plus cleaning of a messy reply.
fn bench_interpret(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    c.bench_function("interpret_noisy_reply", |b| {
        b.iter(|| interpret::interpret(black_box(NOISY_REPLY), &mut rng));
    });
}

/// Benchmark: applying a full delta through a temperament.
fn bench_emotion_apply(c: &mut Criterion) {
    let profile = Roster::builtin().get(Difficulty::Hard).expect("hard");
    let delta = EmotionDelta {
        mood: Some(5),
        trust: Some(3),
        tension: Some(-2),
        affection: Some(4),
        interest: Some(6),
    };
    let vector = warm_vector();
    c.bench_function("emotion_apply", |b| {
        b.iter(|| emotion::apply(black_box(vector), &delta, &profile));
    });
}

criterion_group!(
    benches,
    bench_topic_score,
    bench_repetition,
    bench_prompt_render,
    bench_interpret,
    bench_emotion_apply,
);
criterion_main!(benches);
