use assert_impl::assert_impl;
use digest::{
    generic_array::{typenum::U8, GenericArray},
    FixedOutput, Reset, Update,
};
use once_cell::sync::Lazy;
use std::io::{copy, sink, Read, Result, Write};

/// ECMA-182 多项式的反射形式，与 OSS 服务端 `x-oss-hash-crc64ecma` 一致
pub(super) const POLYNOMIAL: u64 = 0xc96c_5795_d787_0f42;

static TABLE: Lazy<[u64; 256]> = Lazy::new(|| {
    let mut table = [0u64; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = i as u64;
        for _ in 0..8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
        }
        *entry = crc;
    }
    table
});

/// CRC64 计算器，使用 ECMA-182 算法计算 OSS 上文件的 CRC64 校验值
///
/// 对外的初始值为 0，内部在计算前后取反，分块输入与一次性输入结果一致
#[derive(Clone, Debug)]
pub struct Crc64 {
    state: u64,
}

impl Default for Crc64 {
    #[inline]
    fn default() -> Self {
        Self { state: !0 }
    }
}

impl Crc64 {
    /// 构建 CRC64 计算器
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// 以指定的 CRC64 值为起点构建计算器，用于续算
    #[inline]
    pub fn with_initial(crc: u64) -> Self {
        Self { state: !crc }
    }

    /// 获取当前的 CRC64 值
    #[inline]
    pub fn value(&self) -> u64 {
        !self.state
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl Update for Crc64 {
    /// 向 CRC64 计算器输入数据，数据尺寸任意
    fn update(&mut self, data: impl AsRef<[u8]>) {
        let mut state = self.state;
        for &byte in data.as_ref() {
            state = TABLE[((state ^ u64::from(byte)) & 0xff) as usize] ^ (state >> 8);
        }
        self.state = state;
    }
}

impl Write for Crc64 {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl FixedOutput for Crc64 {
    type OutputSize = U8;

    /// 输出 CRC64 值的大端字节序表示
    #[inline]
    fn finalize_into(self, out: &mut GenericArray<u8, Self::OutputSize>) {
        out.copy_from_slice(&self.value().to_be_bytes());
    }

    #[inline]
    fn finalize_into_reset(&mut self, out: &mut GenericArray<u8, Self::OutputSize>) {
        out.copy_from_slice(&self.value().to_be_bytes());
        self.reset();
    }
}

impl Reset for Crc64 {
    /// 重置 CRC64 计算器
    #[inline]
    fn reset(&mut self) {
        self.state = !0;
    }
}

/// 计算一段内存数据的 CRC64 值
pub fn crc64_of(data: impl AsRef<[u8]>) -> u64 {
    let mut digest = Crc64::new();
    digest.update(data);
    digest.value()
}

/// 计算输入流全部数据的 CRC64 值
pub fn crc64_of_reader(reader: &mut dyn Read) -> Result<u64> {
    let mut digest = Crc64::new();
    let mut tee = TeeReader {
        reader,
        digest: &mut digest,
    };
    copy(&mut tee, &mut sink())?;
    Ok(digest.value())
}

struct TeeReader<'a> {
    reader: &'a mut dyn Read,
    digest: &'a mut Crc64,
}

impl Read for TeeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let have_read = self.reader.read(buf)?;
        if have_read > 0 {
            self.digest.update(&buf[..have_read]);
        }
        Ok(have_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_crc64_check_value() {
        assert_eq!(crc64_of(b"123456789"), 0x995d_c9bb_df19_39fa);
        assert_eq!(crc64_of(b""), 0);
        assert_eq!(crc64_of(b"hello world"), 5_981_764_153_023_615_706);
    }

    #[test]
    fn test_crc64_chunked_update() {
        let mut digest = Crc64::new();
        digest.update(b"1234");
        digest.update(b"5");
        digest.update(b"6789");
        assert_eq!(digest.value(), crc64_of(b"123456789"));
    }

    #[test]
    fn test_crc64_with_initial() {
        let mut digest = Crc64::new();
        digest.update(b"1234");
        let mut resumed = Crc64::with_initial(digest.value());
        resumed.update(b"56789");
        assert_eq!(resumed.value(), crc64_of(b"123456789"));
    }

    #[test]
    fn test_crc64_reset() {
        let mut digest = Crc64::new();
        digest.update(b"garbage");
        digest.reset();
        digest.update(b"123456789");
        assert_eq!(digest.value(), crc64_of(b"123456789"));
    }

    #[test]
    fn test_crc64_of_reader() -> Result<()> {
        let mut cursor = Cursor::new(b"123456789".to_vec());
        assert_eq!(crc64_of_reader(&mut cursor)?, crc64_of(b"123456789"));
        Ok(())
    }
}
