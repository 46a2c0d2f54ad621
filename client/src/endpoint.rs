use crate::{
    config::Scheme,
    error::ServiceError,
    request::{is_valid_bucket_name, Parameters},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::{Host, Url};

/// 除 RFC 3986 非保留字符外全部做百分号编码
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) fn url_encode(input: &str) -> String {
    utf8_percent_encode(input, URL_ENCODE_SET).to_string()
}

/// 对对象名称逐段编码，保留路径分隔符
pub(crate) fn encode_path(key: &str) -> String {
    key.split('/').map(|seg| url_encode(seg)).collect::<Vec<_>>().join("/")
}

/// 组装查询串，无值参数只保留名称
pub(crate) fn query_string(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(name, value)| {
            if value.is_empty() {
                url_encode(name)
            } else {
                format!("{}={}", url_encode(name), url_encode(value))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// 解析接入点，未携带协议时按配置补全
pub(crate) fn parse_endpoint(endpoint: &str, scheme: Scheme) -> Result<Url, ServiceError> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_owned()
    } else {
        format!("{}://{}", scheme, endpoint)
    };
    let url = Url::parse(&normalized).map_err(|err| {
        ServiceError::new(
            "ValidateError",
            format!("The endpoint `{}` is invalid: {}", endpoint, err),
        )
    })?;
    if url.host_str().is_none() {
        return Err(ServiceError::new(
            "ValidateError",
            format!("The endpoint `{}` has no host", endpoint),
        ));
    }
    Ok(url)
}

pub(crate) fn is_ip_endpoint(endpoint: &Url) -> bool {
    matches!(
        endpoint.host(),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_))
    )
}

fn host_with_port(endpoint: &Url) -> String {
    let host = endpoint.host_str().unwrap_or_default();
    match endpoint.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_owned(),
    }
}

/// 组装请求主机名
///
/// 虚拟主机风格将桶名作为主机名前缀；CNAME 与 IP 接入点直接使用接入点主机名
pub(crate) fn combine_host(endpoint: &Url, bucket: &str, is_cname: bool) -> String {
    if !bucket.is_empty() && !is_cname && !is_ip_endpoint(endpoint) && is_valid_bucket_name(bucket)
    {
        format!("{}.{}", bucket, host_with_port(endpoint))
    } else {
        host_with_port(endpoint)
    }
}

/// 组装请求路径
///
/// 路径风格（IP 接入点或不适合虚拟主机的桶名）下桶名进入路径
pub(crate) fn combine_path(endpoint: &Url, bucket: &str, key: &str, is_cname: bool) -> String {
    let mut path = String::from("/");
    if !bucket.is_empty()
        && !is_cname
        && (is_ip_endpoint(endpoint) || !is_valid_bucket_name(bucket))
    {
        path.push_str(bucket);
        path.push('/');
    }
    if !key.is_empty() {
        path.push_str(&encode_path(key));
    }
    path
}

/// 组装完整的请求 URL，全部参数都会上线路，无论是否参与签名
pub(crate) fn compose_url(
    endpoint: &Url,
    bucket: &str,
    key: &str,
    is_cname: bool,
    parameters: &Parameters,
) -> Result<Url, ServiceError> {
    let mut raw = format!(
        "{}://{}{}",
        endpoint.scheme(),
        combine_host(endpoint, bucket, is_cname),
        combine_path(endpoint, bucket, key, is_cname),
    );
    if !parameters.is_empty() {
        raw.push('?');
        raw.push_str(&query_string(parameters));
    }
    Url::parse(&raw).map_err(|err| {
        ServiceError::new("ValidateError", format!("The url `{}` is invalid: {}", raw, err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(raw: &str) -> Url {
        parse_endpoint(raw, Scheme::Http).unwrap()
    }

    #[test]
    fn test_virtual_host_style() {
        let url = compose_url(
            &endpoint("oss-cn-hangzhou.aliyuncs.com"),
            "examplebucket",
            "nelson",
            false,
            &Parameters::new(),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://examplebucket.oss-cn-hangzhou.aliyuncs.com/nelson"
        );
    }

    #[test]
    fn test_cname_style() {
        let url = compose_url(
            &endpoint("static.example.com"),
            "examplebucket",
            "nelson",
            true,
            &Parameters::new(),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://static.example.com/nelson");
    }

    #[test]
    fn test_path_style_for_ip_endpoint() {
        let url = compose_url(
            &endpoint("192.168.1.1:8080"),
            "examplebucket",
            "nelson",
            false,
            &Parameters::new(),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.1:8080/examplebucket/nelson");
    }

    #[test]
    fn test_scheme_is_kept_when_present() {
        let url = compose_url(
            &parse_endpoint("https://oss-cn-hangzhou.aliyuncs.com", Scheme::Http).unwrap(),
            "examplebucket",
            "",
            false,
            &Parameters::new(),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/"
        );
    }

    #[test]
    fn test_encode_path_keeps_slashes() {
        assert_eq!(encode_path("dir/sub dir/f+g.txt"), "dir/sub%20dir/f%2Bg.txt");
        assert_eq!(encode_path("中文.txt"), "%E4%B8%AD%E6%96%87.txt");
    }

    #[test]
    fn test_query_string_assembly() {
        let mut parameters = Parameters::new();
        parameters.insert("uploads".to_owned(), String::new());
        parameters.insert("prefix".to_owned(), "p".to_owned());
        // BTreeMap 迭代有序: prefix 在 uploads 之前
        assert_eq!(query_string(&parameters), "prefix=p&uploads");
    }

    #[test]
    fn test_query_string_encodes_values() {
        let mut parameters = Parameters::new();
        parameters.insert("response-content-type".to_owned(), "text/plain".to_owned());
        assert_eq!(
            query_string(&parameters),
            "response-content-type=text%2Fplain"
        );
    }
}
