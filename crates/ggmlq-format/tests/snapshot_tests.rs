//! Snapshot tests for the stable type tables.

use ggmlq_format::{GgmlType, QuantizationType};

#[test]
fn ggml_type_table() {
    let rows: Vec<String> = GgmlType::ALL
        .iter()
        .map(|t| {
            format!(
                "{:<5} id={:<2} block={:<3} bytes={}",
                t.name(),
                t.id(),
                t.block_size(),
                t.block_bytes()
            )
        })
        .collect();
    insta::assert_snapshot!("ggml_type_table", rows.join("\n"));
}

#[test]
fn quantization_type_table() {
    let rows: Vec<(&str, i32, i32, usize)> = QuantizationType::ALL
        .iter()
        .map(|q| (q.name(), q.ftype(), q.ggml_type().id(), q.expected_size(256).unwrap()))
        .collect();
    insta::assert_debug_snapshot!("quantization_type_table", rows);
}
