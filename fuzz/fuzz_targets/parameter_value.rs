#![no_main]

use libfuzzer_sys::fuzz_target;
use regla::value::{TypeTag, Value};

const TAGS: [TypeTag; 9] = [
    TypeTag::Byte,
    TypeTag::Short,
    TypeTag::Int,
    TypeTag::Long,
    TypeTag::Float,
    TypeTag::Double,
    TypeTag::Bool,
    TypeTag::Char,
    TypeTag::String,
];

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing a candidate must never panic, and a parsed value must
        // survive its own rendering for integer tags
        for tag in TAGS {
            if let Ok(value) = Value::parse(tag, input) {
                assert_eq!(value.tag(), tag);
                if tag.is_integer() && !value.is_null() {
                    assert_eq!(Value::parse(tag, &value.to_string()).ok(), Some(value));
                }
            }
        }
    }
});
