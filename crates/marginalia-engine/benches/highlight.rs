use criterion::{Criterion, criterion_group, criterion_main};
use marginalia_engine::{apply_marks, render_markup};
mod common;

fn bench_apply_marks(c: &mut Criterion) {
    let mut group = c.benchmark_group("highlight");
    group.sample_size(10);

    let content = common::generate_markdown_content(100);
    let runs = render_markup(&content);
    let lines = content.lines().count();

    for stride in [50, 5] {
        let marks = common::generate_marks(lines, stride);
        group.bench_function(format!("apply_marks_every_{stride}_lines"), |b| {
            b.iter(|| {
                let split = apply_marks(std::hint::black_box(&runs), &marks);
                std::hint::black_box(split);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apply_marks);
criterion_main!(benches);
