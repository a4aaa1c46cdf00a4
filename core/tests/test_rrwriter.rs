#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use fileop_core::backend::MemFs;
    use fileop_core::compression::{CompressionKind, GzipConcurrency};
    use fileop_core::constants::MIN_GZIP_BLOCK_SIZE;
    use fileop_core::fileutil::{read_file, read_file_as};
    use fileop_core::fs::{FsCreate, WriteStream};
    use fileop_core::rrwriter::{RoundRobinError, RoundRobinWriter};
    use fileop_core::{FileWriter, WriterOptions};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn mem_factory(fs: &MemFs) -> impl FnMut(&str) -> io::Result<Box<dyn WriteStream>> + Send + 'static {
        let fs = fs.clone();
        move |path: &str| fs.create(path)
    }

    fn no_callback(_: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Destination whose `close` always fails.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WriteStream for Broken {
        fn close(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "broken destination"))
        }
    }

    #[test]
    fn zero_destinations_rejected() {
        let res = RoundRobinWriter::builder(0, |i| format!("{i}"), no_callback).build();
        assert!(matches!(res, Err(RoundRobinError::NoDestinations)));
    }

    #[test]
    fn records_spread_evenly_starting_at_zero() {
        init_logger();
        let fs = MemFs::new();
        let n = 4;
        let k = 25;
        let rr = RoundRobinWriter::builder(n, |i| format!("part-{i}"), no_callback)
            .writer_factory(mem_factory(&fs))
            .build()
            .unwrap();
        assert_eq!(rr.len(), n);

        for rec in 0..n * k {
            rr.write(format!("{rec}\n").as_bytes()).unwrap();
        }
        rr.close().unwrap();

        for i in 0..n {
            let body = String::from_utf8(read_file(&fs, &format!("part-{i}")).unwrap()).unwrap();
            let records: Vec<usize> = body.lines().map(|l| l.parse().unwrap()).collect();
            assert_eq!(records.len(), k);
            assert!(records.iter().all(|r| r % n == i), "destination {i}: {records:?}");
            assert!(records.windows(2).all(|w| w[0] < w[1]), "destination {i} out of order: {records:?}");
        }
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let fs = MemFs::new();
        let n = 3;
        let rr = Arc::new(
            RoundRobinWriter::builder(n, |i| format!("c-{i}"), no_callback)
                .writer_factory(mem_factory(&fs))
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let rr = Arc::clone(&rr);
                std::thread::spawn(move || {
                    for j in 0..300 {
                        (&*rr).write_all(format!("{t}:{j}\n").as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let rr = Arc::try_unwrap(rr).unwrap();
        rr.close().unwrap();

        let total: usize = (0..n)
            .map(|i| String::from_utf8(read_file(&fs, &format!("c-{i}")).unwrap()).unwrap().lines().count())
            .sum();
        assert_eq!(total, 8 * 300);
    }

    #[test]
    fn callback_runs_per_path_in_order() {
        let fs = MemFs::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let rr = RoundRobinWriter::builder(3, |i| format!("cb-{i}"), move |path: &str| {
            sink.lock().unwrap().push(path.to_string());
            Ok(())
        })
        .writer_factory(mem_factory(&fs))
        .build()
        .unwrap();
        rr.write(b"x").unwrap();
        rr.close().unwrap();
        assert_eq!(*seen.lock().unwrap(), ["cb-0", "cb-1", "cb-2"]);
    }

    #[test]
    fn callback_failure_surfaces_with_path() {
        let fs = MemFs::new();
        let rr = RoundRobinWriter::builder(2, |i| format!("f-{i}"), |path: &str| {
            if path == "f-1" {
                anyhow::bail!("upload of {path} refused");
            }
            Ok(())
        })
        .writer_factory(mem_factory(&fs))
        .build()
        .unwrap();
        match rr.close() {
            Err(RoundRobinError::Callback { path, source }) => {
                assert_eq!(path, "f-1");
                assert!(source.to_string().contains("refused"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn close_errors_are_aggregated_and_skip_callbacks() {
        let fs = MemFs::new();
        let called = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&called);
        let mut inner = mem_factory(&fs);
        let rr = RoundRobinWriter::builder(4, |i| format!("agg-{i}"), move |_: &str| {
            *counter.lock().unwrap() += 1;
            Ok(())
        })
        .writer_factory(move |path: &str| {
            if path.ends_with('1') || path.ends_with('3') {
                Ok(Box::new(Broken) as Box<dyn WriteStream>)
            } else {
                inner(path)
            }
        })
        .build()
        .unwrap();

        match rr.close() {
            Err(RoundRobinError::Close(errors)) => {
                let failed: Vec<_> = errors.iter().map(|e| (e.index, e.path.as_str())).collect();
                assert_eq!(failed, [(1, "agg-1"), (3, "agg-3")]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(*called.lock().unwrap(), 0);
    }

    #[test]
    fn failed_open_closes_already_opened() {
        let fs = MemFs::new();
        let res = RoundRobinWriter::builder(3, |i| format!("{}/o-{i}", if i == 2 { "missing" } else { "." }), no_callback)
            .writer_factory(mem_factory(&fs))
            .build();
        match res {
            Err(RoundRobinError::Open { path, source }) => {
                assert_eq!(path, "missing/o-2");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(read_file(&fs, "o-0").unwrap().is_empty());
    }

    #[test]
    fn compressed_destinations_via_file_writer() {
        let fs = MemFs::new();
        let backend = fs.clone();
        let rr = RoundRobinWriter::builder(2, |i| format!("gz/{i}.gz"), no_callback)
            .writer_factory(move |path: &str| {
                let w = FileWriter::open(&backend, path, 0, CompressionKind::Gzip).map_err(io::Error::from)?;
                Ok(Box::new(w) as Box<dyn WriteStream>)
            })
            .build()
            .unwrap();
        for rec in ["a\n", "b\n", "c\n", "d\n"] {
            rr.write(rec.as_bytes()).unwrap();
        }
        rr.close().unwrap();
        assert_eq!(read_file_as(&fs, "gz/0.gz", CompressionKind::Gzip).unwrap(), b"a\nc\n");
        assert_eq!(read_file_as(&fs, "gz/1.gz", CompressionKind::Gzip).unwrap(), b"b\nd\n");
    }

    /// Destination that takes at most `limit` bytes per write.
    struct Trickle {
        inner: Box<dyn WriteStream>,
        limit: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.inner.write_all(&buf[..n])?;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl WriteStream for Trickle {
        fn close(&mut self) -> io::Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn short_writes_keep_record_on_one_destination() {
        let fs = MemFs::new();
        let mut inner = mem_factory(&fs);
        let rr = RoundRobinWriter::builder(3, |i| format!("t-{i}"), no_callback)
            .writer_factory(move |path: &str| {
                Ok(Box::new(Trickle { inner: inner(path)?, limit: 3 }) as Box<dyn WriteStream>)
            })
            .build()
            .unwrap();
        for rec in ["alpha\n", "bravo\n", "charlie\n", "delta\n"] {
            assert_eq!(rr.write(rec.as_bytes()).unwrap(), rec.len());
        }
        rr.close().unwrap();
        assert_eq!(read_file(&fs, "t-0").unwrap(), b"alpha\ndelta\n");
        assert_eq!(read_file(&fs, "t-1").unwrap(), b"bravo\n");
        assert_eq!(read_file(&fs, "t-2").unwrap(), b"charlie\n");
    }

    #[test]
    fn records_larger_than_a_gzip_block_stay_whole() {
        let fs = MemFs::new();
        let backend = fs.clone();
        let opts = WriterOptions::new(0, CompressionKind::Gzip)
            .with_gzip_concurrency(GzipConcurrency::new(MIN_GZIP_BLOCK_SIZE, 2));
        let rr = RoundRobinWriter::builder(2, |i| format!("big/{i}.gz"), no_callback)
            .writer_factory(move |path: &str| {
                let w = FileWriter::open_with_options(&backend, path, &opts).map_err(io::Error::from)?;
                Ok(Box::new(w) as Box<dyn WriteStream>)
            })
            .build()
            .unwrap();

        let size = MIN_GZIP_BLOCK_SIZE + 1904;
        for fill in [b'a', b'b', b'c', b'd'] {
            (&rr).write_all(&vec![fill; size]).unwrap();
        }
        rr.close().unwrap();

        let expect = |x: u8, y: u8| [vec![x; size], vec![y; size]].concat();
        assert_eq!(read_file_as(&fs, "big/0.gz", CompressionKind::Gzip).unwrap(), expect(b'a', b'c'));
        assert_eq!(read_file_as(&fs, "big/1.gz", CompressionKind::Gzip).unwrap(), expect(b'b', b'd'));
    }

    #[test]
    fn default_factory_writes_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_path_buf();
        let rr = RoundRobinWriter::builder(2, move |i| base.join(format!("l-{i}.txt")).display().to_string(), no_callback)
            .build()
            .unwrap();
        rr.write(b"zero").unwrap();
        rr.write(b"one").unwrap();
        rr.close().unwrap();
        assert_eq!(std::fs::read(dir.path().join("l-0.txt")).unwrap(), b"zero");
        assert_eq!(std::fs::read(dir.path().join("l-1.txt")).unwrap(), b"one");
    }
}
