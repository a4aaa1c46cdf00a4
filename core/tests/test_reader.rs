#[cfg(test)]
mod tests {
    use std::io::{self, Read};
    use std::sync::Arc;

    use fileop_core::backend::MemFs;
    use fileop_core::compression::{compress_bytes, CodecError, CompressionKind};
    use fileop_core::fileutil::{write_file, write_file_as};
    use fileop_core::fs::{FsOpen, ReadStream};
    use fileop_core::pool::Pool;
    use fileop_core::{is_unhandled_error, is_unhandled_io_error, FileOpError, FileReader};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn lines_of(reader: &mut FileReader) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = reader.read_line().unwrap() {
            out.push(String::from_utf8(line.to_vec()).unwrap());
        }
        out
    }

    // --- Failure scenarios ---

    #[test]
    fn missing_path_is_unhandled_not_found() {
        init_logger();
        let fs = MemFs::new();
        let err = FileReader::open(&fs, "nope/missing.txt", CompressionKind::None).unwrap_err();
        assert!(matches!(err, FileOpError::Open { .. }));
        assert!(err.is_not_found());
        assert!(is_unhandled_error(&err));
        assert_eq!(err.path(), "nope/missing.txt");

        let as_io: io::Error = err.into();
        assert!(is_unhandled_io_error(&as_io));
    }

    #[test]
    fn malformed_header_is_unhandled() {
        let fs = MemFs::new();
        write_file(&fs, "plain.gz", &b"definitely not gzip"[..]).unwrap();
        let err = FileReader::open(&fs, "plain.gz", CompressionKind::Gzip).unwrap_err();
        assert!(matches!(
            err,
            FileOpError::Codec { source: CodecError::MalformedHeader { kind: CompressionKind::Gzip }, .. }
        ));
        assert!(is_unhandled_error(&err));
    }

    #[test]
    fn empty_compressed_file_is_end_of_stream() {
        let fs = MemFs::new();
        write_file(&fs, "empty.zz", io::empty()).unwrap();
        let err = FileReader::open(&fs, "empty.zz", CompressionKind::Zlib).unwrap_err();
        assert!(matches!(err, FileOpError::Codec { source: CodecError::EmptyStream { .. }, .. }));
        assert!(is_unhandled_error(&err));
    }

    #[test]
    fn transient_errors_are_handled() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "slow backend");
        assert!(!is_unhandled_io_error(&err));
        let err = FileOpError::Open { path: "a".into(), source: io::Error::new(io::ErrorKind::ConnectionReset, "x") };
        assert!(!is_unhandled_error(&err));
    }

    #[test]
    fn corruption_past_the_header_is_handled() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream");
        assert!(!is_unhandled_io_error(&err));

        let header = FileOpError::Codec {
            path: "h.gz".into(),
            source: CodecError::MalformedHeader { kind: CompressionKind::Gzip },
            cleanup: None,
        };
        assert!(is_unhandled_io_error(&io::Error::from(header)));
    }

    // --- Codec failure releases the raw handle ---

    struct CountingFs {
        inner: MemFs,
        closed: Arc<std::sync::atomic::AtomicUsize>,
        fail_close: bool,
    }

    struct Counted {
        inner: Box<dyn ReadStream>,
        closed: Arc<std::sync::atomic::AtomicUsize>,
        fail_close: bool,
    }

    impl Read for Counted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl ReadStream for Counted {
        fn close(&mut self) -> io::Result<()> {
            self.closed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.close()?;
            if self.fail_close {
                return Err(io::Error::new(io::ErrorKind::Other, "release refused"));
            }
            Ok(())
        }
    }

    impl FsOpen for CountingFs {
        fn open(&self, path: &str) -> io::Result<Box<dyn ReadStream>> {
            let inner = self.inner.open(path)?;
            Ok(Box::new(Counted { inner, closed: Arc::clone(&self.closed), fail_close: self.fail_close }))
        }
    }

    #[test]
    fn raw_handle_closed_on_codec_failure_and_on_close() {
        let fs = CountingFs { inner: MemFs::new(), closed: Default::default(), fail_close: false };
        write_file(&fs.inner, "bad.sz", &b"not snappy framing"[..]).unwrap();
        write_file_as(&fs.inner, "good.sz", &b"ok\n"[..], CompressionKind::Snappy).unwrap();

        assert!(FileReader::open(&fs, "bad.sz", CompressionKind::Snappy).is_err());
        assert_eq!(fs.closed.load(std::sync::atomic::Ordering::SeqCst), 1);

        let reader = FileReader::open(&fs, "good.sz", CompressionKind::Snappy).unwrap();
        reader.close().unwrap();
        assert_eq!(fs.closed.load(std::sync::atomic::Ordering::SeqCst), 2);

        drop(FileReader::open(&fs, "good.sz", CompressionKind::Snappy).unwrap());
        assert_eq!(fs.closed.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_cleanup_close_travels_with_codec_error() {
        let fs = CountingFs { inner: MemFs::new(), closed: Default::default(), fail_close: true };
        write_file(&fs.inner, "bad.gz", &b"plain bytes"[..]).unwrap();

        let err = FileReader::open(&fs, "bad.gz", CompressionKind::Gzip).unwrap_err();
        assert!(err.to_string().contains("release refused"), "{err}");
        match &err {
            FileOpError::Codec { cleanup: Some(e), .. } => assert_eq!(e.kind(), io::ErrorKind::Other),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs.closed.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    // --- Line scanning ---

    #[test]
    fn read_line_strips_lf_and_crlf() {
        let fs = MemFs::new();
        write_file(&fs, "lines.txt", &b"one\r\ntwo\n\nthree"[..]).unwrap();
        let mut reader = FileReader::open(&fs, "lines.txt", CompressionKind::None).unwrap();
        assert_eq!(lines_of(&mut reader), ["one", "two", "", "three"]);
        reader.close().unwrap();
    }

    #[test]
    fn end_of_stream_is_idempotent() {
        let fs = MemFs::new();
        write_file_as(&fs, "one.gz", &b"only line\n"[..], CompressionKind::Gzip).unwrap();
        let mut reader = FileReader::open(&fs, "one.gz", CompressionKind::Gzip).unwrap();
        assert_eq!(reader.read_line().unwrap(), Some(&b"only line"[..]));
        assert!(!reader.is_eof());
        for _ in 0..3 {
            assert_eq!(reader.read_line().unwrap(), None);
            assert!(reader.is_eof());
        }
        reader.close().unwrap();
    }

    #[test]
    fn long_lines_are_not_truncated() {
        let fs = MemFs::new();
        let long = "x".repeat(1 << 20);
        write_file(&fs, "long.txt", format!("{long}\nshort\n").as_bytes()).unwrap();
        let mut reader = FileReader::open(&fs, "long.txt", CompressionKind::None).unwrap();
        assert_eq!(reader.read_line().unwrap().map(<[u8]>::len), Some(long.len()));
        assert_eq!(reader.read_line().unwrap(), Some(&b"short"[..]));
        reader.close().unwrap();
    }

    #[test]
    fn every_codec_reads_back_lines() {
        let fs = MemFs::new();
        let body = b"alpha\nbeta\ngamma\n";
        for kind in CompressionKind::ALL {
            let path = format!("data/{}.log", kind);
            write_file_as(&fs, &path, &body[..], kind).unwrap();
            let mut reader = FileReader::open(&fs, &path, kind).unwrap();
            assert_eq!(reader.kind(), kind);
            assert_eq!(lines_of(&mut reader), ["alpha", "beta", "gamma"], "{kind}");
            reader.close().unwrap();
        }
    }

    #[test]
    fn byte_reads_see_decompressed_data() {
        let fs = MemFs::new();
        let packed = compress_bytes(b"raw payload", CompressionKind::Zlib, None).unwrap();
        write_file(&fs, "blob.zz", &packed[..]).unwrap();

        let mut reader = FileReader::open(&fs, "blob.zz", CompressionKind::Zlib).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "raw payload");
        reader.close().unwrap();
    }

    // --- Pooling ---

    #[test]
    fn pooled_and_unpooled_readers_agree() {
        let fs = MemFs::new();
        write_file(&fs, "p.txt", &b"a\nb\n"[..]).unwrap();

        let pooled = Arc::new(Pool::new(2));
        let fresh = Arc::new(Pool::disabled());
        for _ in 0..3 {
            let mut a = FileReader::open_with(&pooled, &fs, "p.txt", CompressionKind::None).unwrap();
            let mut b = FileReader::open_with(&fresh, &fs, "p.txt", CompressionKind::None).unwrap();
            assert_eq!(lines_of(&mut a), lines_of(&mut b));
            assert_eq!(a.path(), "p.txt");
            a.close().unwrap();
            b.close().unwrap();
        }
        assert_eq!(pooled.stats().created, 1);
        assert_eq!(pooled.stats().reused, 2);
        assert_eq!(fresh.stats().created, 3);
    }
}
