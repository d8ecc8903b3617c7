// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use marginalia_engine::{AbsoluteRange, AnnotationId, Mark};

#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with *some* content and `code`.\n\n- Bullet point\n  - Nested item\n- Another item\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

/// One mark every `stride` lines, each covering part of two lines.
#[allow(dead_code)]
pub fn generate_marks(lines: usize, stride: usize) -> Vec<Mark> {
    (1..lines)
        .step_by(stride.max(1))
        .filter_map(|line| {
            let range = AbsoluteRange::new(line, Some(3), line + 1, Some(5)).ok()?;
            Some(Mark {
                id: AnnotationId::new_v4(),
                range,
            })
        })
        .collect()
}
