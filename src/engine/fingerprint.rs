// ==========================================
// 爆破设计引擎 - 审计指纹
// ==========================================
// 用途: 装药结果 / 起爆时序与其输入状态绑定, 便于事后比对
// ==========================================

use sha2::{Digest, Sha256};

/// 计算内容的 SHA-256 指纹（十六进制）
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// f64 的精确文本表示（按位编码, 避免格式化舍入）
pub fn exact_f64(value: f64) -> String {
    format!("{:016x}", value.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        assert_eq!(calculate_checksum("A|B"), calculate_checksum("A|B"));
        assert_ne!(calculate_checksum("A|B"), calculate_checksum("B|A"));
    }

    #[test]
    fn test_exact_f64_distinguishes_close_values() {
        assert_ne!(exact_f64(0.1 + 0.2), exact_f64(0.3));
        assert_eq!(exact_f64(1.5), exact_f64(1.5));
    }
}
