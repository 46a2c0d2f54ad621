use crate::{
    bucket::{serialize_xml, xml_payload},
    endpoint::encode_path,
    models::{CompleteMultipartUpload, CompletePart},
    object::ObjectContent,
    request::{
        is_valid_bucket_name, is_valid_object_key, Parameters, RequestFlags, ServiceRequest,
        ValidationError,
    },
};
use aliyun_oss_http::{
    header::HeaderName, HeaderMap, HeaderValue, OnProgressCallback, RequestBody,
};
use std::{io::Result as IoResult, path::PathBuf};

pub(crate) const MAX_PART_NUMBER: u32 = 10000;

fn validate_bucket_and_key(bucket: &str, key: &str) -> Result<(), ValidationError> {
    if !is_valid_bucket_name(bucket) {
        return Err(ValidationError::InvalidBucketName);
    }
    if !is_valid_object_key(key) {
        return Err(ValidationError::InvalidObjectKey);
    }
    Ok(())
}

fn validate_upload_id(upload_id: &str) -> Result<(), ValidationError> {
    if upload_id.is_empty() {
        Err(ValidationError::EmptyUploadId)
    } else {
        Ok(())
    }
}

fn validate_part_number(part_number: u32) -> Result<(), ValidationError> {
    if (1..=MAX_PART_NUMBER).contains(&part_number) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPartNumber)
    }
}

/// 初始化分片上传
#[derive(Clone, Debug)]
pub struct InitiateMultipartUploadRequest {
    bucket: String,
    key: String,
    headers: HeaderMap,
}

impl InitiateMultipartUploadRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            headers: HeaderMap::new(),
        }
    }

    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl ServiceRequest for InitiateMultipartUploadRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("uploads".to_owned(), String::new());
        parameters
    }
}

/// 上传分片
pub struct UploadPartRequest {
    bucket: String,
    key: String,
    upload_id: String,
    part_number: u32,
    content: ObjectContent,
    progress: Option<OnProgressCallback>,
}

impl UploadPartRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        part_number: u32,
        content: Vec<u8>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            part_number,
            content: ObjectContent::Bytes(content),
            progress: None,
        }
    }

    /// 以本地文件为分片数据来源
    pub fn from_file(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        part_number: u32,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            part_number,
            content: ObjectContent::File(path.into()),
            progress: None,
        }
    }

    #[inline]
    pub fn on_progress(mut self, callback: OnProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

impl ServiceRequest for UploadPartRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn flags(&self) -> RequestFlags {
        RequestFlags::new().with_check_crc64()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        validate_upload_id(&self.upload_id)?;
        validate_part_number(self.part_number)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("partNumber".to_owned(), self.part_number.to_string());
        parameters.insert("uploadId".to_owned(), self.upload_id.clone());
        parameters
    }

    fn payload(&self) -> IoResult<Option<RequestBody>> {
        self.content.open().map(Some)
    }

    fn progress_callback(&self) -> Option<OnProgressCallback> {
        self.progress.clone()
    }
}

/// 复制已有对象作为分片
#[derive(Clone, Debug)]
pub struct UploadPartCopyRequest {
    bucket: String,
    key: String,
    upload_id: String,
    part_number: u32,
    source_bucket: String,
    source_key: String,
    source_range: Option<(u64, u64)>,
}

impl UploadPartCopyRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        part_number: u32,
        source_bucket: impl Into<String>,
        source_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            part_number,
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            source_range: None,
        }
    }

    /// 只复制源对象的指定字节区间
    #[inline]
    pub fn source_range(mut self, begin: u64, end: u64) -> Self {
        self.source_range = Some((begin, end));
        self
    }
}

impl ServiceRequest for UploadPartCopyRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        validate_bucket_and_key(&self.source_bucket, &self.source_key)?;
        validate_upload_id(&self.upload_id)?;
        validate_part_number(self.part_number)
    }

    fn special_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let source = format!(
            "/{}/{}",
            self.source_bucket,
            encode_path(&self.source_key)
        );
        if let Ok(value) = HeaderValue::from_str(&source) {
            headers.insert("x-oss-copy-source", value);
        }
        if let Some((begin, end)) = self.source_range {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes={}-{}", begin, end)) {
                headers.insert("x-oss-copy-source-range", value);
            }
        }
        headers
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("partNumber".to_owned(), self.part_number.to_string());
        parameters.insert("uploadId".to_owned(), self.upload_id.clone());
        parameters
    }
}

/// 完成分片上传
#[derive(Clone, Debug)]
pub struct CompleteMultipartUploadRequest {
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<CompletePart>,
    encoding_type: Option<String>,
}

impl CompleteMultipartUploadRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        parts: Vec<CompletePart>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            parts,
            encoding_type: None,
        }
    }

    #[inline]
    pub fn encoding_type(mut self, encoding_type: impl Into<String>) -> Self {
        self.encoding_type = Some(encoding_type.into());
        self
    }
}

impl ServiceRequest for CompleteMultipartUploadRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        validate_upload_id(&self.upload_id)?;
        if self.parts.is_empty() {
            return Err(ValidationError::EmptyPartList);
        }
        Ok(())
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("uploadId".to_owned(), self.upload_id.clone());
        if let Some(encoding_type) = self.encoding_type.as_deref() {
            parameters.insert("encoding-type".to_owned(), encoding_type.to_owned());
        }
        parameters
    }

    fn payload(&self) -> IoResult<Option<RequestBody>> {
        let payload = CompleteMultipartUpload {
            part: self.parts.clone(),
        };
        xml_payload(serialize_xml("CompleteMultipartUpload", &payload)?)
    }
}

/// 取消分片上传
#[derive(Clone, Debug)]
pub struct AbortMultipartUploadRequest {
    bucket: String,
    key: String,
    upload_id: String,
}

impl AbortMultipartUploadRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
        }
    }
}

impl ServiceRequest for AbortMultipartUploadRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        validate_upload_id(&self.upload_id)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("uploadId".to_owned(), self.upload_id.clone());
        parameters
    }
}

/// 列举进行中的分片上传
#[derive(Clone, Debug)]
pub struct ListMultipartUploadsRequest {
    bucket: String,
    prefix: Option<String>,
    delimiter: Option<String>,
    key_marker: Option<String>,
    upload_id_marker: Option<String>,
    max_uploads: Option<usize>,
}

impl ListMultipartUploadsRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            delimiter: None,
            key_marker: None,
            upload_id_marker: None,
            max_uploads: None,
        }
    }

    #[inline]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[inline]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    #[inline]
    pub fn key_marker(mut self, key_marker: impl Into<String>) -> Self {
        self.key_marker = Some(key_marker.into());
        self
    }

    #[inline]
    pub fn upload_id_marker(mut self, upload_id_marker: impl Into<String>) -> Self {
        self.upload_id_marker = Some(upload_id_marker.into());
        self
    }

    #[inline]
    pub fn max_uploads(mut self, max_uploads: usize) -> Self {
        self.max_uploads = Some(max_uploads);
        self
    }
}

impl ServiceRequest for ListMultipartUploadsRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if is_valid_bucket_name(&self.bucket) {
            Ok(())
        } else {
            Err(ValidationError::InvalidBucketName)
        }
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("uploads".to_owned(), String::new());
        if let Some(prefix) = self.prefix.as_deref() {
            parameters.insert("prefix".to_owned(), prefix.to_owned());
        }
        if let Some(delimiter) = self.delimiter.as_deref() {
            parameters.insert("delimiter".to_owned(), delimiter.to_owned());
        }
        if let Some(key_marker) = self.key_marker.as_deref() {
            parameters.insert("key-marker".to_owned(), key_marker.to_owned());
        }
        if let Some(upload_id_marker) = self.upload_id_marker.as_deref() {
            parameters.insert("upload-id-marker".to_owned(), upload_id_marker.to_owned());
        }
        if let Some(max_uploads) = self.max_uploads {
            parameters.insert("max-uploads".to_owned(), max_uploads.to_string());
        }
        parameters
    }
}

/// 列举已上传的分片
#[derive(Clone, Debug)]
pub struct ListPartsRequest {
    bucket: String,
    key: String,
    upload_id: String,
    max_parts: Option<usize>,
    part_number_marker: Option<u32>,
}

impl ListPartsRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            max_parts: None,
            part_number_marker: None,
        }
    }

    #[inline]
    pub fn max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = Some(max_parts);
        self
    }

    #[inline]
    pub fn part_number_marker(mut self, part_number_marker: u32) -> Self {
        self.part_number_marker = Some(part_number_marker);
        self
    }
}

impl ServiceRequest for ListPartsRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        validate_upload_id(&self.upload_id)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("uploadId".to_owned(), self.upload_id.clone());
        if let Some(max_parts) = self.max_parts {
            parameters.insert("max-parts".to_owned(), max_parts.to_string());
        }
        if let Some(marker) = self.part_number_marker {
            parameters.insert("part-number-marker".to_owned(), marker.to_string());
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_part_parameters_are_sub_resources() {
        let request =
            UploadPartRequest::new("examplebucket", "big.data", "UPLOAD-1", 2, b"part".to_vec());
        let canonical = crate::auth::canonical_string(
            &aliyun_oss_http::Method::PUT,
            "/examplebucket/big.data",
            "date",
            &HeaderMap::new(),
            &request.special_parameters(),
        );
        assert!(canonical.ends_with("/examplebucket/big.data?partNumber=2&uploadId=UPLOAD-1"));
    }

    #[test]
    fn test_complete_requires_parts_and_upload_id() {
        let request = CompleteMultipartUploadRequest::new(
            "examplebucket",
            "big.data",
            "UPLOAD-1",
            Vec::new(),
        );
        assert_eq!(request.validate(), Err(ValidationError::EmptyPartList));

        let request = CompleteMultipartUploadRequest::new(
            "examplebucket",
            "big.data",
            "",
            vec![CompletePart::new(1, "etag")],
        );
        assert_eq!(request.validate(), Err(ValidationError::EmptyUploadId));
    }

    #[test]
    fn test_part_number_bounds() {
        let request =
            UploadPartRequest::new("examplebucket", "big.data", "UPLOAD-1", 0, Vec::new());
        assert_eq!(request.validate(), Err(ValidationError::InvalidPartNumber));

        let request = UploadPartRequest::new(
            "examplebucket",
            "big.data",
            "UPLOAD-1",
            MAX_PART_NUMBER + 1,
            Vec::new(),
        );
        assert_eq!(request.validate(), Err(ValidationError::InvalidPartNumber));

        let request = UploadPartRequest::new(
            "examplebucket",
            "big.data",
            "UPLOAD-1",
            MAX_PART_NUMBER,
            Vec::new(),
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_upload_part_copy_headers() {
        let request = UploadPartCopyRequest::new(
            "examplebucket",
            "big.data",
            "UPLOAD-1",
            1,
            "src-bucket",
            "src.data",
        )
        .source_range(0, 1023);
        let headers = request.special_headers();
        assert_eq!(
            headers
                .get("x-oss-copy-source")
                .and_then(|v| v.to_str().ok()),
            Some("/src-bucket/src.data"),
        );
        assert_eq!(
            headers
                .get("x-oss-copy-source-range")
                .and_then(|v| v.to_str().ok()),
            Some("bytes=0-1023"),
        );
    }

    #[test]
    fn test_complete_payload() {
        let request = CompleteMultipartUploadRequest::new(
            "examplebucket",
            "big.data",
            "UPLOAD-1",
            vec![CompletePart::new(1, "etag-1"), CompletePart::new(2, "etag-2")],
        );
        let mut body = request.payload().unwrap().unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut body, &mut xml).unwrap();
        assert!(xml.starts_with("<CompleteMultipartUpload>"));
        assert!(xml.contains("<Part><PartNumber>1</PartNumber><ETag>etag-1</ETag></Part>"));
    }
}
