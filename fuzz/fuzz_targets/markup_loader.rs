#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tree) = doctree::parse_markup(input) {
        for node in tree.descendants(tree.root()) {
            assert!(tree.is_attached(node));
        }
    }
});
