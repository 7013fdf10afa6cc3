use noteme::{
    document::{Document, Position},
    editor::{DocumentEditor, SelectionAnchor, collect_segments},
    generation::{RevealStep, StreamReveal},
    render::render_document,
    sanitize::{AmmoniaSanitizer, SanitizedMarkup},
    splice::{splice_text_container, splice_ui_fragment},
    theme::Theme,
};
use std::time::{Duration, Instant};

/// Performance benchmark suite for note editing and generated-content splicing
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Note rendering, including fragment boxes
/// - Splicing fragments and text containers at an anchor
/// - Streaming reveal ticks
/// - Live range upkeep while typing
const SMALL_NOTE_LINES: usize = 10;
const MEDIUM_NOTE_LINES: usize = 100;
const LARGE_NOTE_LINES: usize = 1000;
const HUGE_NOTE_LINES: usize = 10000;

const ITERATIONS: usize = 100;

const FRAGMENT_MARKUP: &str = r#"<div class="card"><p>Generated card</p><button data-action="deleteSelectedText">Delete</button><button data-action="wrapWithBold">Bold</button></div>"#;

const SAMPLE_WORDS: &[&str] = &[
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

fn create_test_note(num_lines: usize, words_per_line: usize) -> Document {
    let lines: Vec<String> = (0..num_lines)
        .map(|i| {
            (0..words_per_line)
                .map(|j| SAMPLE_WORDS[(i + j) % SAMPLE_WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    Document::from_lines(&refs)
}

/// Anchor on the first word of the middle line.
fn middle_anchor(document: &mut Document) -> SelectionAnchor {
    let segments = collect_segments(document);
    let segment = &segments[segments.len() / 2];
    let end = segment.len.min(5);
    let range = document
        .create_range(Position::new(segment.node, 0), Position::new(segment.node, end))
        .unwrap();
    let text = document.range_text(range).unwrap();
    SelectionAnchor { range, text }
}

fn fragment_markup() -> SanitizedMarkup {
    SanitizedMarkup::from_untrusted(FRAGMENT_MARKUP, &AmmoniaSanitizer::new()).unwrap()
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    for _ in 0..3 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

#[test]
fn bench_rendering_performance() {
    let theme = Theme::default();
    for (label, lines) in [
        ("small", SMALL_NOTE_LINES),
        ("medium", MEDIUM_NOTE_LINES),
        ("large", LARGE_NOTE_LINES),
    ] {
        let document = create_test_note(lines, 12);
        let result = benchmark(&format!("render {label} note ({lines} lines)"), ITERATIONS, || {
            let render = render_document(&document, 80, None, &theme);
            assert!(render.total_lines >= lines);
        });
        result.print();
    }
}

#[test]
fn bench_rendering_with_fragments() {
    let theme = Theme::default();
    let mut document = create_test_note(MEDIUM_NOTE_LINES, 12);
    for _ in 0..20 {
        let anchor = middle_anchor(&mut document);
        splice_ui_fragment(&mut document, &anchor, fragment_markup()).unwrap();
    }

    let result = benchmark("render note with 20 fragments", ITERATIONS, || {
        let render = render_document(&document, 80, None, &theme);
        assert_eq!(render.hit_regions.len(), 40);
    });
    result.print();
}

#[test]
fn bench_splice_ui_fragment() {
    let base = create_test_note(LARGE_NOTE_LINES, 12);

    let clone_only = benchmark("clone large note (baseline)", ITERATIONS, || {
        let document = base.clone();
        assert_eq!(document.range_count(), 1);
    });
    clone_only.print();

    let result = benchmark("clone + splice fragment into large note", ITERATIONS, || {
        let mut document = base.clone();
        let anchor = middle_anchor(&mut document);
        let spliced = splice_ui_fragment(&mut document, &anchor, fragment_markup()).unwrap();
        assert!(document.is_attached(spliced.container));
    });
    result.print();
}

#[test]
fn bench_stream_reveal() {
    let base = create_test_note(LARGE_NOTE_LINES, 12);
    let body = SAMPLE_WORDS.join(" ").repeat(10);

    let result = benchmark("reveal 1k+ chars into large note", 20, || {
        let mut document = base.clone();
        let anchor = middle_anchor(&mut document);
        let spliced = splice_text_container(&mut document, &anchor).unwrap();
        let mut reveal = StreamReveal::new(spliced.container, &body, Duration::ZERO);
        while let Ok(RevealStep::Revealed(_)) = reveal.tick(&mut document) {}
        assert_eq!(document.text_content(spliced.container), body);
    });
    result.print();
}

#[test]
fn bench_typing_with_many_live_ranges() {
    let mut document = create_test_note(MEDIUM_NOTE_LINES, 12);
    let segments = collect_segments(&document);
    for segment in &segments {
        document
            .create_range(Position::new(segment.node, 0), Position::new(segment.node, segment.len))
            .unwrap();
    }
    let mut editor = DocumentEditor::new(document);
    editor.move_to_line_end();

    let result = benchmark("type one char with 100 live ranges", ITERATIONS * 10, || {
        editor.insert_char('x');
    });
    result.print();
}

#[test]
fn bench_segment_collection() {
    for lines in [MEDIUM_NOTE_LINES, LARGE_NOTE_LINES, HUGE_NOTE_LINES] {
        let document = create_test_note(lines, 8);
        let result = benchmark(&format!("collect segments ({lines} lines)"), 20, || {
            assert_eq!(collect_segments(&document).len(), lines);
        });
        result.print();
    }
}
