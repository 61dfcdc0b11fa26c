#![no_main]

use libfuzzer_sys::fuzz_target;
use pardep::expression::ExpressionTree;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic; whatever parses must print back to
        // text that parses again
        if let Ok(tree) = ExpressionTree::parse_collecting(input) {
            let printed = tree.to_string();
            let _ = ExpressionTree::parse(&printed, tree.variables());
            let _ = tree.simplify();
        }
    }
});
