pub const HASH_HEX_LEN: usize = 16;

pub fn hash_bytes(bytes: &[u8]) -> String {
    let full_hex = blake3::hash(bytes).to_hex();
    full_hex.as_str()[..HASH_HEX_LEN].to_string()
}

pub fn hash_text(text: &str) -> String {
    hash_bytes(text.as_bytes())
}
