#![deny(
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    keyword_idents,
    macro_use_extern_crate,
    non_ascii_idents,
    unsafe_code,
    unused_extern_crates,
    unused_lifetimes,
    unused_qualifications
)]

use assert_impl::assert_impl;
use hmac::{Hmac, Mac, NewMac};
use once_cell::sync::Lazy;
use sha1::Sha1;
use std::{
    any::Any,
    borrow::Cow,
    collections::VecDeque,
    env,
    ffi::OsStr,
    fmt::{self, Debug},
    io::{Error, ErrorKind, Result},
    sync::{Arc, RwLock},
};

pub mod preclude {
    pub use super::CredentialProvider;
}

/// 认证信息
///
/// 包含阿里云的 AccessKeyId、AccessKeySecret，以及 STS 临时授权场景下的安全令牌
#[derive(Clone, Debug)]
pub struct Credential<'a> {
    access_key_id: Cow<'a, str>,
    access_key_secret: Cow<'a, str>,
    security_token: Option<Cow<'a, str>>,
}

impl<'a> Credential<'a> {
    /// 创建认证信息
    #[inline]
    pub fn new(
        access_key_id: impl Into<Cow<'a, str>>,
        access_key_secret: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: None,
        }
    }

    /// 创建带安全令牌的认证信息
    #[inline]
    pub fn with_security_token(
        access_key_id: impl Into<Cow<'a, str>>,
        access_key_secret: impl Into<Cow<'a, str>>,
        security_token: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: Some(security_token.into()),
        }
    }

    /// 获取认证信息的 AccessKeyId
    #[inline]
    pub fn access_key_id(&self) -> &str {
        self.access_key_id.as_ref()
    }

    /// 获取认证信息的 AccessKeySecret
    #[inline]
    pub fn access_key_secret(&self) -> &str {
        self.access_key_secret.as_ref()
    }

    /// 获取认证信息的安全令牌
    #[inline]
    pub fn security_token(&self) -> Option<&str> {
        self.security_token.as_deref()
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl Credential<'_> {
    /// 使用 OSS 签名算法对数据进行签名，返回 Base64 编码的签名
    ///
    /// 参考[签名算法文档](https://help.aliyun.com/document_detail/31951.html)
    pub fn sign(&self, data: &[u8]) -> String {
        base64ed_hmac_sha1(self.access_key_secret.as_ref(), data)
    }
}

/// 以 AccessKeySecret 为密钥计算数据的 HMAC-SHA1 摘要，返回 Base64 编码结果
pub fn base64ed_hmac_sha1(secret: &str, data: &[u8]) -> String {
    let mut hmac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    hmac.update(data);
    base64::encode(hmac.finalize().into_bytes())
}

/// 认证信息提供者
///
/// 为认证信息提供者的实现提供接口支持，每次请求签名前都会被调用一次
pub trait CredentialProvider: Any + Debug + Sync + Send {
    /// 返回阿里云认证信息
    fn get(&self) -> Result<Credential>;

    fn as_any(&self) -> &dyn Any;
    fn as_credential_provider(&self) -> &dyn CredentialProvider;
}

/// 静态认证信息提供者，一旦创建则不可修改
#[derive(Clone, Eq, PartialEq)]
pub struct StaticCredentialProvider {
    access_key_id: Cow<'static, str>,
    access_key_secret: Cow<'static, str>,
    security_token: Option<Cow<'static, str>>,
}

impl StaticCredentialProvider {
    /// 构建静态认证信息提供者，只需要传入静态的 AccessKeyId 和 AccessKeySecret 即可
    pub fn new(
        access_key_id: impl Into<Cow<'static, str>>,
        access_key_secret: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: None,
        }
    }

    /// 构建带安全令牌的静态认证信息提供者
    pub fn with_security_token(
        access_key_id: impl Into<Cow<'static, str>>,
        access_key_secret: impl Into<Cow<'static, str>>,
        security_token: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: Some(security_token.into()),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get(&self) -> Result<Credential> {
        Ok(match self.security_token.as_deref() {
            Some(security_token) => Credential::with_security_token(
                Cow::Borrowed(self.access_key_id.as_ref()),
                Cow::Borrowed(self.access_key_secret.as_ref()),
                Cow::Borrowed(security_token),
            ),
            None => Credential::new(
                Cow::Borrowed(self.access_key_id.as_ref()),
                Cow::Borrowed(self.access_key_secret.as_ref()),
            ),
        })
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_credential_provider(&self) -> &dyn CredentialProvider {
        self
    }
}

impl AsRef<dyn CredentialProvider> for StaticCredentialProvider {
    #[inline]
    fn as_ref(&self) -> &dyn CredentialProvider {
        self.as_credential_provider()
    }
}

impl Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!(
            "StaticCredentialProvider {{ access_key_id: {:?}, access_key_secret: CENSORED }}",
            self.access_key_id,
        ))
    }
}

/// 全局认证信息提供者，可以将认证信息配置在全局变量中
///
/// 任何全局认证信息提供者实例都可以设置和访问全局认证信息
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct GlobalCredentialProvider;

static GLOBAL_CREDENTIAL: Lazy<RwLock<Option<Credential<'static>>>> =
    Lazy::new(|| RwLock::new(None));

impl GlobalCredentialProvider {
    /// 配置全局认证信息
    pub fn setup(
        access_key_id: impl Into<Cow<'static, str>>,
        access_key_secret: impl Into<Cow<'static, str>>,
    ) {
        let mut global_credential = GLOBAL_CREDENTIAL.write().unwrap();
        *global_credential = Some(Credential::new(access_key_id, access_key_secret));
    }

    /// 清空全局认证信息
    pub fn clear() {
        let mut global_credential = GLOBAL_CREDENTIAL.write().unwrap();
        *global_credential = None;
    }
}

impl CredentialProvider for GlobalCredentialProvider {
    fn get(&self) -> Result<Credential> {
        if let Some(credential) = GLOBAL_CREDENTIAL.read().unwrap().as_ref() {
            Ok(credential.clone())
        } else {
            Err(Error::new(
                ErrorKind::Other,
                "GlobalCredentialProvider is not setuped, please call GlobalCredentialProvider::setup() to do it",
            ))
        }
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_credential_provider(&self) -> &dyn CredentialProvider {
        self
    }
}

impl Debug for GlobalCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(credential) = GLOBAL_CREDENTIAL.read().unwrap().as_ref() {
            f.write_fmt(format_args!(
                "GlobalCredentialProvider {{ access_key_id: {:?}, access_key_secret: CENSORED }}",
                credential.access_key_id,
            ))
        } else {
            write!(f, "GlobalCredentialProvider {{ None }}")
        }
    }
}

/// 环境变量认证信息提供者，可以将认证信息配置在环境变量中
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct EnvCredentialProvider;

/// 设置 AccessKeyId 的环境变量
pub const OSS_ACCESS_KEY_ID_ENV_KEY: &str = "OSS_ACCESS_KEY_ID";
/// 设置 AccessKeySecret 的环境变量
pub const OSS_ACCESS_KEY_SECRET_ENV_KEY: &str = "OSS_ACCESS_KEY_SECRET";
/// 设置安全令牌的环境变量
pub const OSS_SESSION_TOKEN_ENV_KEY: &str = "OSS_SESSION_TOKEN";

impl EnvCredentialProvider {
    /// 配置环境变量认证信息提供者
    #[inline]
    pub fn setup(access_key_id: impl AsRef<OsStr>, access_key_secret: impl AsRef<OsStr>) {
        env::set_var(OSS_ACCESS_KEY_ID_ENV_KEY, access_key_id);
        env::set_var(OSS_ACCESS_KEY_SECRET_ENV_KEY, access_key_secret);
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn get(&self) -> Result<Credential> {
        match (
            env::var(OSS_ACCESS_KEY_ID_ENV_KEY),
            env::var(OSS_ACCESS_KEY_SECRET_ENV_KEY),
        ) {
            (Ok(access_key_id), Ok(access_key_secret))
                if !access_key_id.is_empty() && !access_key_secret.is_empty() =>
            {
                match env::var(OSS_SESSION_TOKEN_ENV_KEY) {
                    Ok(security_token) if !security_token.is_empty() => {
                        Ok(Credential::with_security_token(
                            access_key_id,
                            access_key_secret,
                            security_token,
                        ))
                    }
                    _ => Ok(Credential::new(access_key_id, access_key_secret)),
                }
            }
            _ => {
                static ERROR_MESSAGE: Lazy<String> = Lazy::new(|| {
                    format!("EnvCredentialProvider is not setuped, please call EnvCredentialProvider::setup() to do it, or set environment variable `{}` and `{}`", OSS_ACCESS_KEY_ID_ENV_KEY, OSS_ACCESS_KEY_SECRET_ENV_KEY)
                });
                Err(Error::new(ErrorKind::Other, ERROR_MESSAGE.as_str()))
            }
        }
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_credential_provider(&self) -> &dyn CredentialProvider {
        self
    }
}

impl Debug for EnvCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (
            env::var_os(OSS_ACCESS_KEY_ID_ENV_KEY),
            env::var_os(OSS_ACCESS_KEY_SECRET_ENV_KEY),
        ) {
            (Some(access_key_id), Some(_)) => f.write_fmt(format_args!(
                "EnvCredentialProvider {{ access_key_id: {:?}, access_key_secret: CENSORED }}",
                access_key_id,
            )),
            _ => write!(f, "EnvCredentialProvider {{ None }}"),
        }
    }
}

/// 认证信息串提供者
///
/// 将多个认证信息提供者串联，遍历并找寻第一个可用认证信息
#[derive(Clone, Debug)]
pub struct ChainCredentialsProvider {
    credentials: Arc<[Box<dyn CredentialProvider>]>,
}

impl CredentialProvider for ChainCredentialsProvider {
    fn get(&self) -> Result<Credential> {
        if let Some(credential) = self.credentials.iter().find_map(|c| c.get().ok()) {
            Ok(credential)
        } else {
            Err(Error::new(
                ErrorKind::Other,
                "All credentials are failed to get",
            ))
        }
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_credential_provider(&self) -> &dyn CredentialProvider {
        self
    }
}

impl Default for ChainCredentialsProvider {
    #[inline]
    fn default() -> Self {
        ChainCredentialsProviderBuilder::default()
            .append_credential(Box::new(GlobalCredentialProvider))
            .append_credential(Box::new(EnvCredentialProvider))
            .build()
    }
}

/// 串联认证信息构建器
///
/// 接受多个认证信息提供者并将他们串联成串联认证信息
#[derive(Default)]
pub struct ChainCredentialsProviderBuilder {
    credentials: VecDeque<Box<dyn CredentialProvider>>,
}

impl ChainCredentialsProviderBuilder {
    /// 构建新的串联认证信息构建器
    #[inline]
    pub fn new() -> ChainCredentialsProviderBuilder {
        Default::default()
    }

    /// 将认证信息提供者推送到认证串末端
    #[inline]
    pub fn append_credential(
        &mut self,
        credential: Box<dyn CredentialProvider>,
    ) -> &mut ChainCredentialsProviderBuilder {
        self.credentials.push_back(credential);
        self
    }

    /// 将认证信息提供者推送到认证串顶端
    #[inline]
    pub fn prepend_credential(
        &mut self,
        credential: Box<dyn CredentialProvider>,
    ) -> &mut ChainCredentialsProviderBuilder {
        self.credentials.push_front(credential);
        self
    }

    /// 串联认证信息
    pub fn build(&mut self) -> ChainCredentialsProvider {
        assert!(
            !self.credentials.is_empty(),
            "ChainCredentialsProvider must owns at least one CredentialProvider"
        );
        ChainCredentialsProvider {
            credentials: Vec::from(std::mem::take(&mut self.credentials)).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{boxed::Box, error::Error, result::Result, thread};

    #[derive(Copy, Clone, Debug)]
    struct UnavailableCredentialProvider;

    impl CredentialProvider for UnavailableCredentialProvider {
        fn get(&self) -> super::Result<Credential> {
            Err(super::Error::new(
                ErrorKind::Other,
                "test unavailable provider",
            ))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_credential_provider(&self) -> &dyn CredentialProvider {
            self
        }
    }

    #[test]
    fn test_static_credential_provider() -> Result<(), Box<dyn Error>> {
        let provider = StaticCredentialProvider::new("abcdefghklmnopq", "1234567890");
        let credential = provider.get()?;
        assert_eq!(credential.access_key_id(), "abcdefghklmnopq");
        assert_eq!(credential.access_key_secret(), "1234567890");
        assert!(credential.security_token().is_none());

        let provider =
            StaticCredentialProvider::with_security_token("ak", "sk", "security-token-value");
        assert_eq!(provider.get()?.security_token(), Some("security-token-value"));
        Ok(())
    }

    #[test]
    fn test_sign() {
        let credential = Credential::new("ak", "test-secret");
        assert_eq!(
            credential.sign(b"GET\n\n\nWed, 28 Nov 2018 09:26:08 GMT\n/examplebucket/nelson"),
            "3b77Z9t4EfHdnnPjMhEkuiYV0d4=",
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let credential = Credential::new("ak", "sk");
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let credential = credential.clone();
                thread::spawn(move || credential.sign(b"canonical-string"))
            })
            .collect();
        let mut signatures: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        signatures.dedup();
        assert_eq!(signatures.len(), 1);
    }

    #[test]
    fn test_chain_credentials_provider() -> Result<(), Box<dyn Error>> {
        let chain = ChainCredentialsProviderBuilder::new()
            .append_credential(Box::new(UnavailableCredentialProvider))
            .append_credential(Box::new(StaticCredentialProvider::new("chain-ak", "chain-sk")))
            .build();
        let credential = chain.get()?;
        assert_eq!(credential.access_key_id(), "chain-ak");
        assert_eq!(credential.access_key_secret(), "chain-sk");
        Ok(())
    }

    #[test]
    fn test_debug_censors_secret() {
        let provider = StaticCredentialProvider::new("visible-ak", "very-secret");
        let repr = format!("{:?}", provider);
        assert!(repr.contains("visible-ak"));
        assert!(!repr.contains("very-secret"));
    }
}
