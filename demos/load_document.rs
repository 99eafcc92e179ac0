//! Document Loading Example
//!
//! This example loads an XML file and walks its tree.
//!
//! Run with: cargo run --example load_document

use bncparse::get_xml;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/data/sample.xml");

    println!("Loading: {}\n", path.display());
    let doc = get_xml(&path)?;
    let root = doc.root();

    println!("Root element: {}", root.name());
    for (name, value) in root.attributes() {
        println!("  @{} = {}", name, value);
    }
    println!("Elements: {}, depth: {}\n", doc.len(), doc.depth());

    // Sentences with their word tags
    for sentence in root.iter_named("s") {
        let n = sentence.get("n").unwrap_or("?");
        println!("s{} (line {}): {}", n, sentence.sourceline(), sentence.itertext());
        for word in sentence.children().filter(|w| w.local_name() == "w") {
            println!(
                "    {:<10} {:<4} {}",
                word.text().unwrap_or("").trim(),
                word.get("c5").unwrap_or("-"),
                word.get("hw").unwrap_or("-"),
            );
        }
    }

    // The tree serializes to JSON
    let title = root
        .find("teiHeader")
        .and_then(|h| h.descendants().find(|e| e.local_name() == "title"));
    if let Some(title) = title {
        println!("\nTitle as JSON: {}", serde_json::to_string(&title)?);
    }

    Ok(())
}
