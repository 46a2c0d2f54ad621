use crate::request::Parameters;
use aliyun_oss_http::{
    header::{AsHeaderName, CONTENT_TYPE},
    HeaderMap, Method,
};
use once_cell::sync::Lazy;
use std::collections::HashSet;

const CONTENT_MD5: &str = "content-md5";

/// 参与签名的子资源参数白名单
///
/// 白名单之外的参数不进入待签名串，但仍然随请求上线路
static SUB_RESOURCES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "acl",
        "uploadId",
        "partNumber",
        "location",
        "lifecycle",
        "logging",
        "website",
        "referer",
        "cors",
        "delete",
        "stat",
        "bucketInfo",
        "storageCapacity",
        "symlink",
        "restore",
        "objectMeta",
        "uploads",
        "continuation-token",
        "encoding-type",
        "security-token",
        "x-oss-process",
        "versionId",
    ])
});

pub(crate) fn is_sub_resource(name: &str) -> bool {
    SUB_RESOURCES.contains(name) || name.starts_with("response-")
}

fn header_or_default<'h>(headers: &'h HeaderMap, name: impl AsHeaderName) -> &'h str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// 构造规范化资源
///
/// 形如 `/bucket/key`；只有桶时为 `/bucket/`，两者皆空时为 `/`
pub(crate) fn canonical_resource(bucket: &str, key: &str) -> String {
    let mut resource = String::from("/");
    if !bucket.is_empty() {
        resource.push_str(bucket);
        resource.push('/');
    }
    if !key.is_empty() {
        resource.push_str(key);
    }
    resource
}

/// 构造待签名的规范化字符串
///
/// ```text
///   VERB + "\n"
/// + Content-MD5 + "\n"
/// + Content-Type + "\n"
/// + Date + "\n"
/// + CanonicalizedOSSHeaders
/// + CanonicalizedResource [+ "?" + 子资源参数]
/// ```
///
/// 预签名 URL 将过期时间戳填入 Date 槽位，其余构造完全一致
pub(crate) fn canonical_string(
    method: &Method,
    resource: &str,
    date: &str,
    headers: &HeaderMap,
    parameters: &Parameters,
) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(method.as_str());
    out.push('\n');
    out.push_str(header_or_default(headers, CONTENT_MD5));
    out.push('\n');
    out.push_str(header_or_default(headers, CONTENT_TYPE));
    out.push('\n');
    out.push_str(date);
    out.push('\n');

    // x-oss- 开头的请求头按小写名称排序参与签名,值去除首尾空白
    let mut oss_headers = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-oss-"))
        .map(|(name, value)| {
            (
                name.as_str().to_lowercase(),
                value.to_str().unwrap_or_default().trim().to_owned(),
            )
        })
        .collect::<Vec<(String, String)>>();
    oss_headers.sort();
    for (name, value) in oss_headers {
        out.push_str(&name);
        out.push(':');
        out.push_str(&value);
        out.push('\n');
    }

    out.push_str(resource);
    let sub_resources = parameters
        .iter()
        .filter(|(name, _)| is_sub_resource(name))
        .map(|(name, value)| {
            if value.is_empty() {
                name.clone()
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect::<Vec<String>>();
    if !sub_resources.is_empty() {
        out.push('?');
        out.push_str(&sub_resources.join("&"));
    }
    out
}

/// 组装 Authorization 请求头的值
pub(crate) fn authorization(access_key_id: &str, signature: &str) -> String {
    format!("OSS {}:{}", access_key_id, signature)
}
