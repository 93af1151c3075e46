// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2

/// One note, repeated `size` times. Starts with `# Title` at 0..5.
///
/// Each copy mixes the inline forms the canonical writer has to care about:
/// nested and punctuation-edged marks, titled, reference and empty links,
/// images, escapes, footnotes and hard breaks, inside quotes and both list
/// kinds.
#[allow(dead_code)]
pub fn generate_notes(size: usize) -> String {
    let note = concat!(
        "# Title\n\n",
        "Plain *emphasis*, **strong**, ***both***, *outer **inner** text* and `code`.\n",
        "Marks around punctuation: *(aside)*, **\"quoted\"** and a*b*c; not Hello*,* there.\n\n",
        "Links: [inline](https://example.com), [titled](/t \"Title\"), [ref][r], ",
        "[**bold link**](/b), an empty [](/gone) one and wow\\![not an image](/n).\n",
        "An ![image](img.png \"Img\") then a hard break\\\n",
        "and a footnote[^1] with \\*escaped\\* stars & AT&T.\n\n",
        "[r]: /reference \"Ref\"\n",
        "[spare]: /never-used\n\n",
        "[^1]: The footnote *body*.\n\n",
        "> Quote with a [link](/q) and *marks*.\n",
        ">\n",
        "> - listed **inside**\n",
        ">   1. deeper\n\n",
        "1. first\n",
        "2. second with `code`\n\n",
        "999999998. near the marker limit\n",
        "999999999. at it\n",
        "1. past it\n\n",
        "- bullet\n",
        "  - nested *item*\n",
        "- another\n\n",
        "```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n",
    );
    note.repeat(size)
}

/// `sections` top-level sections, each nesting headings, quotes and lists
/// `depth` levels down.
#[allow(dead_code)]
pub fn generate_nested_document(sections: usize, depth: usize) -> String {
    let mut content = String::new();
    for section in 0..sections {
        content.push_str(&format!("# Section {section}\n\n"));
        content.push_str(&nested_level(depth, 2));
        content.push('\n');
    }
    content
}

#[allow(dead_code)]
fn nested_level(remaining_depth: usize, level: usize) -> String {
    if remaining_depth == 0 {
        return String::new();
    }

    let mut content = format!("{} Level {level}\n\n", "#".repeat(level));
    content.push_str(&format!(
        "Level {level} has *mixed **nested*** marks, a [link {level}](/l/{level} \"L{level}\") and `tick {level}`.\n\n"
    ));

    let quote = "> ".repeat((level - 1).min(3));
    content.push_str(&format!("{quote}Quoted at **{level}**, see [above](#top).\n\n"));

    let indent = "   ".repeat((level - 2).min(1));
    for item in 0..3 {
        content.push_str(&format!("{indent}{}. item *{item}* of {level}\n", item + 1));
    }
    content.push('\n');

    if level % 3 == 0 {
        content.push_str(&format!("{quote}```rust\n{quote}let value = {level};\n{quote}```\n\n"));
    }

    if remaining_depth > 1 && level < 6 {
        content.push_str(&nested_level(remaining_depth - 1, level + 1));
    }

    content
}
