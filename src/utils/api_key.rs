use rand::Rng;

const API_KEY_PREFIX: &str = "gca_";
const API_KEY_RANDOM_LEN: usize = 32;
const KEY_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 生成一把新的 API key，形如 gca_<32位随机字母数字>
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..API_KEY_RANDOM_LEN)
        .map(|_| KEY_CHARS[rng.gen_range(0..KEY_CHARS.len())] as char)
        .collect();
    format!("{API_KEY_PREFIX}{random}")
}

/// 列表展示用的掩码形式：前 8 位 + "..." + 后 4 位
pub fn preview_api_key(key: &str) -> String {
    if key.len() <= 12 {
        return key.to_string();
    }
    format!("{}...{}", &key[..8], &key[key.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(key.len(), API_KEY_PREFIX.len() + API_KEY_RANDOM_LEN);
        assert!(
            key[API_KEY_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        );
    }

    #[test]
    fn test_generated_keys_are_different() {
        // 理论上可能相同，但概率可以忽略
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn test_preview_masks_middle() {
        let key = "gca_ABCDEFGHIJKLMNOPQRSTUVWXYZabcdef";
        let preview = preview_api_key(key);
        assert_eq!(preview, "gca_ABCD...cdef");
        assert!(!preview.contains("EFGHIJK"));
    }
}
