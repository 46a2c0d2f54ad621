use aliyun_oss_credential::base64ed_hmac_sha1;
use std::fmt::Debug;

/// 签名算法
///
/// 版本号必须与构造待签名串时使用的版本一致，混用属于编程错误
pub trait Signer: Debug + Send + Sync {
    /// 签名算法版本号
    fn version(&self) -> u32;

    /// 以 AccessKeySecret 为密钥对待签名串计算签名，返回 Base64 编码结果
    fn generate(&self, canonical_string: &str, access_key_secret: &str) -> String;
}

/// HMAC-SHA1 签名算法，即 OSS 的 V1 签名
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HmacSha1Signer;

impl Signer for HmacSha1Signer {
    #[inline]
    fn version(&self) -> u32 {
        1
    }

    fn generate(&self, canonical_string: &str, access_key_secret: &str) -> String {
        base64ed_hmac_sha1(access_key_secret, canonical_string.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_known_signature() {
        let signer = HmacSha1Signer;
        assert_eq!(signer.version(), 1);
        assert_eq!(
            signer.generate(
                "GET\n\n\nWed, 28 Nov 2018 09:26:08 GMT\n/examplebucket/nelson",
                "test-secret",
            ),
            "3b77Z9t4EfHdnnPjMhEkuiYV0d4=",
        );
    }

    #[test]
    fn test_generate_is_deterministic() {
        let signer = HmacSha1Signer;
        let first = signer.generate("canonical", "secret");
        let second = signer.generate("canonical", "secret");
        assert_eq!(first, second);
    }
}
