use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use markdown_loom_engine::editing::{Command, Editor};
use markdown_loom_engine::{Mark, Span};
mod common;

fn bench_command_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("commands");
    group.sample_size(10);

    let content = common::generate_notes(100);
    let editor = Editor::from_markdown(&content).unwrap();

    // "Title" occupies 0..5, so typing at 3 lands in the first heading.
    group.bench_function("insert_command", |b| {
        let mut e = editor.clone();
        b.iter(|| {
            let cmd = Command::InsertText {
                at: std::hint::black_box(3),
                text: std::hint::black_box("test".to_string()),
            };
            std::hint::black_box(e.execute(cmd)).unwrap();
        });
    });

    group.bench_function("toggle_bold", |b| {
        let mut e = editor.clone();
        b.iter(|| {
            let cmd = Command::ToggleMark {
                mark: Mark::Bold,
                span: std::hint::black_box(Span::new(0, 5)),
            };
            std::hint::black_box(e.execute(cmd)).unwrap();
        });
    });

    group.bench_function("type_then_undo_all", |b| {
        b.iter_batched(
            || editor.clone(),
            |mut e| {
                for at in 0..50 {
                    e.execute(Command::InsertText {
                        at: at + 1,
                        text: "x".to_string(),
                    })
                    .unwrap();
                }
                while e.can_undo() {
                    e.undo().unwrap();
                }
                e
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_command_operations);
criterion_main!(benches);
