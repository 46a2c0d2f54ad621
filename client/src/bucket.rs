use crate::{
    models::CreateBucketConfiguration,
    request::{is_valid_bucket_name, Parameters, ServiceRequest, ValidationError},
};
use aliyun_oss_http::{HeaderMap, HeaderValue, RequestBody};
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Result as IoResult};

/// 存储类型
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StorageClass {
    Standard,
    InfrequentAccess,
    Archive,
}

impl StorageClass {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::InfrequentAccess => "IA",
            Self::Archive => "Archive",
        }
    }
}

/// 访问权限
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CannedAccessControlList {
    Private,
    PublicRead,
    PublicReadWrite,
}

impl CannedAccessControlList {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
        }
    }
}

pub(crate) fn xml_payload(raw: String) -> IoResult<Option<RequestBody>> {
    Ok(Some(RequestBody::from_bytes(raw.into_bytes())))
}

pub(crate) fn serialize_xml<T: serde::Serialize>(root: &str, value: &T) -> IoResult<String> {
    quick_xml::se::to_string_with_root(root, value)
        .map_err(|err| IoError::new(IoErrorKind::Other, err.to_string()))
}

fn validate_bucket(bucket: &str) -> Result<(), ValidationError> {
    if is_valid_bucket_name(bucket) {
        Ok(())
    } else {
        Err(ValidationError::InvalidBucketName)
    }
}

/// 列举当前账号的全部存储空间
#[derive(Clone, Debug, Default)]
pub struct ListBucketsRequest {
    prefix: Option<String>,
    marker: Option<String>,
    max_keys: Option<usize>,
}

impl ListBucketsRequest {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[inline]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    #[inline]
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

impl ServiceRequest for ListBucketsRequest {
    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        if let Some(prefix) = self.prefix.as_deref() {
            parameters.insert("prefix".to_owned(), prefix.to_owned());
        }
        if let Some(marker) = self.marker.as_deref() {
            parameters.insert("marker".to_owned(), marker.to_owned());
        }
        if let Some(max_keys) = self.max_keys {
            parameters.insert("max-keys".to_owned(), max_keys.to_string());
        }
        parameters
    }
}

/// 创建存储空间
#[derive(Clone, Debug)]
pub struct CreateBucketRequest {
    bucket: String,
    storage_class: Option<StorageClass>,
    acl: Option<CannedAccessControlList>,
}

impl CreateBucketRequest {
    #[inline]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            storage_class: None,
            acl: None,
        }
    }

    #[inline]
    pub fn storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = Some(storage_class);
        self
    }

    #[inline]
    pub fn acl(mut self, acl: CannedAccessControlList) -> Self {
        self.acl = Some(acl);
        self
    }
}

impl ServiceRequest for CreateBucketRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket(&self.bucket)
    }

    fn special_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(acl) = self.acl {
            headers.insert("x-oss-acl", HeaderValue::from_static(acl.as_str()));
        }
        headers
    }

    fn payload(&self) -> IoResult<Option<RequestBody>> {
        match self.storage_class {
            Some(storage_class) => {
                let configuration = CreateBucketConfiguration {
                    storage_class: storage_class.as_str().to_owned(),
                };
                xml_payload(serialize_xml("CreateBucketConfiguration", &configuration)?)
            }
            None => Ok(None),
        }
    }
}

/// 删除存储空间
#[derive(Clone, Debug)]
pub struct DeleteBucketRequest {
    bucket: String,
}

impl DeleteBucketRequest {
    #[inline]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }
}

impl ServiceRequest for DeleteBucketRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket(&self.bucket)
    }
}

/// 列举存储空间内的对象
#[derive(Clone, Debug)]
pub struct ListObjectsRequest {
    bucket: String,
    prefix: Option<String>,
    marker: Option<String>,
    delimiter: Option<String>,
    max_keys: Option<usize>,
    encoding_type: Option<String>,
}

impl ListObjectsRequest {
    #[inline]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            marker: None,
            delimiter: None,
            max_keys: None,
            encoding_type: None,
        }
    }

    #[inline]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[inline]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    #[inline]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    #[inline]
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    #[inline]
    pub fn encoding_type(mut self, encoding_type: impl Into<String>) -> Self {
        self.encoding_type = Some(encoding_type.into());
        self
    }
}

impl ServiceRequest for ListObjectsRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket(&self.bucket)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        if let Some(prefix) = self.prefix.as_deref() {
            parameters.insert("prefix".to_owned(), prefix.to_owned());
        }
        if let Some(marker) = self.marker.as_deref() {
            parameters.insert("marker".to_owned(), marker.to_owned());
        }
        if let Some(delimiter) = self.delimiter.as_deref() {
            parameters.insert("delimiter".to_owned(), delimiter.to_owned());
        }
        if let Some(max_keys) = self.max_keys {
            parameters.insert("max-keys".to_owned(), max_keys.to_string());
        }
        if let Some(encoding_type) = self.encoding_type.as_deref() {
            parameters.insert("encoding-type".to_owned(), encoding_type.to_owned());
        }
        parameters
    }
}

macro_rules! bucket_sub_resource_request {
    ($name:ident, $doc:expr, $sub_resource:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug)]
        pub struct $name {
            bucket: String,
        }

        impl $name {
            #[inline]
            pub fn new(bucket: impl Into<String>) -> Self {
                Self {
                    bucket: bucket.into(),
                }
            }
        }

        impl ServiceRequest for $name {
            fn bucket(&self) -> &str {
                &self.bucket
            }

            fn validate(&self) -> Result<(), ValidationError> {
                validate_bucket(&self.bucket)
            }

            fn special_parameters(&self) -> Parameters {
                let mut parameters = Parameters::new();
                parameters.insert($sub_resource.to_owned(), String::new());
                parameters
            }
        }
    };
}

bucket_sub_resource_request!(GetBucketAclRequest, "查询存储空间的访问权限", "acl");
bucket_sub_resource_request!(GetBucketLocationRequest, "查询存储空间的地域", "location");
bucket_sub_resource_request!(GetBucketInfoRequest, "查询存储空间的详细信息", "bucketInfo");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_objects_parameters_are_not_signed_but_travel() {
        let request = ListObjectsRequest::new("examplebucket")
            .prefix("fun/")
            .max_keys(100);
        let parameters = request.special_parameters();
        assert_eq!(parameters.get("prefix").map(String::as_str), Some("fun/"));
        assert_eq!(parameters.get("max-keys").map(String::as_str), Some("100"));
        assert!(crate::auth::canonical_string(
            &aliyun_oss_http::Method::GET,
            "/examplebucket/",
            "date",
            &HeaderMap::new(),
            &parameters,
        )
        .ends_with("/examplebucket/"));
    }

    #[test]
    fn test_get_bucket_acl_sub_resource() {
        let request = GetBucketAclRequest::new("examplebucket");
        assert_eq!(
            request.special_parameters().get("acl").map(String::as_str),
            Some(""),
        );
    }

    #[test]
    fn test_create_bucket_payload() {
        let request = CreateBucketRequest::new("examplebucket")
            .storage_class(StorageClass::InfrequentAccess)
            .acl(CannedAccessControlList::PublicRead);
        let mut body = request.payload().unwrap().unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut body, &mut xml).unwrap();
        assert_eq!(
            xml,
            "<CreateBucketConfiguration><StorageClass>IA</StorageClass></CreateBucketConfiguration>"
        );
        assert_eq!(
            request
                .special_headers()
                .get("x-oss-acl")
                .and_then(|v| v.to_str().ok()),
            Some("public-read"),
        );
    }

    #[test]
    fn test_invalid_bucket_is_rejected() {
        assert_eq!(
            CreateBucketRequest::new("AB").validate(),
            Err(ValidationError::InvalidBucketName)
        );
    }
}
