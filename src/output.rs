use std::{
    fs::File,
    io::{self, BufWriter, Cursor, LineWriter, Sink, Stderr, StderrLock, Stdout, StdoutLock},
    net::TcpStream,
    process::ChildStdin,
};

/// How an [`Output`] makes written bytes visible, in order of preference.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flushing {
    /// [`io::Write::flush`]. Failures are ignored.
    Fallible,

    /// [`Output::flush_infallible`].
    Infallible,

    /// [`Output::sync`], which pushes bytes all the way to storage. Failures
    /// are ignored.
    Sync,

    /// Bytes are visible as soon as they're written; there's nothing to do.
    Noop,
}

/// An output stream which knows how it should be flushed.
///
/// The copy loop asks once per copy, and then flushes after every character
/// the way the answer says.
pub trait Output: io::Write {
    /// How this stream is flushed.
    fn flushing(&self) -> Flushing;

    /// A flush which cannot fail. Only called when `flushing` returns
    /// [`Flushing::Infallible`].
    #[inline]
    fn flush_infallible(&mut self) {}

    /// Sync written data to storage. Only called when `flushing` returns
    /// [`Flushing::Sync`].
    #[inline]
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Choose the flush action for `output`, returning it along with the
/// capability it was chosen for.
///
/// This is the only place the capability is examined; the returned function
/// is called once per character.
pub fn flush_action<O: Output + ?Sized>(output: &O) -> (Flushing, fn(&mut O)) {
    let flushing = output.flushing();
    let action: fn(&mut O) = match flushing {
        Flushing::Fallible => |o: &mut O| {
            let _ = o.flush();
        },
        Flushing::Infallible => |o: &mut O| o.flush_infallible(),
        Flushing::Sync => |o: &mut O| {
            let _ = o.sync();
        },
        Flushing::Noop => |_: &mut O| (),
    };
    (flushing, action)
}

/// Adapts any [`io::Write`] into an [`Output`] which is never flushed.
///
/// Use this for writers with no flush or sync operation worth calling, or
/// for writers this crate doesn't know about.
#[derive(Debug, Default)]
pub struct Unflushed<W: io::Write> {
    inner: W,
}

impl<W: io::Write> Unflushed<W> {
    /// Construct a new instance of `Unflushed` wrapping `inner`.
    #[inline]
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Gets a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Return the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> io::Write for Unflushed<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: io::Write> Output for Unflushed<W> {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Noop
    }
}

impl<O: Output + ?Sized> Output for &mut O {
    #[inline]
    fn flushing(&self) -> Flushing {
        (**self).flushing()
    }

    #[inline]
    fn flush_infallible(&mut self) {
        (**self).flush_infallible()
    }

    #[inline]
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

impl<O: Output + ?Sized> Output for Box<O> {
    #[inline]
    fn flushing(&self) -> Flushing {
        (**self).flushing()
    }

    #[inline]
    fn flush_infallible(&mut self) {
        (**self).flush_infallible()
    }

    #[inline]
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

macro_rules! fallible {
    ($($t:ty),* $(,)?) => {
        $(
            impl Output for $t {
                #[inline]
                fn flushing(&self) -> Flushing {
                    Flushing::Fallible
                }
            }
        )*
    };
}

fallible!(
    Stdout,
    StdoutLock<'_>,
    Stderr,
    StderrLock<'_>,
    TcpStream,
    ChildStdin,
);

#[cfg(unix)]
fallible!(std::os::unix::net::UnixStream);

impl<W: io::Write> Output for BufWriter<W> {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Fallible
    }
}

impl<W: io::Write> Output for LineWriter<W> {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Fallible
    }
}

impl Output for Vec<u8> {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Infallible
    }
}

impl Output for Cursor<Vec<u8>> {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Infallible
    }
}

impl Output for &mut [u8] {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Infallible
    }
}

impl Output for &File {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Sync
    }

    #[inline]
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl Output for File {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Sync
    }

    #[inline]
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl Output for Sink {
    #[inline]
    fn flushing(&self) -> Flushing {
        Flushing::Noop
    }
}

#[cfg(unix)]
pub use fd::FdWriter;

#[cfg(unix)]
mod fd {
    use super::{Flushing, Output};
    use std::{io, os::unix::io::AsRawFd};

    /// An unbuffered [`Output`] which writes directly to a file descriptor
    /// and syncs it with `fsync`.
    ///
    /// Rust's `Stdout` is line-buffered; this writes each character straight
    /// to the descriptor instead. The descriptor is borrowed from `inner`,
    /// which keeps it open.
    pub struct FdWriter<Inner: AsRawFd> {
        inner: Inner,
    }

    impl<Inner: AsRawFd> FdWriter<Inner> {
        /// Construct a new instance of `FdWriter` writing to the file
        /// descriptor of `inner`.
        #[inline]
        pub fn new(inner: Inner) -> Self {
            Self { inner }
        }

        /// Gets a reference to the underlying descriptor owner.
        pub fn get_ref(&self) -> &Inner {
            &self.inner
        }

        /// Return the underlying descriptor owner.
        pub fn into_inner(self) -> Inner {
            self.inner
        }
    }

    impl<Inner: AsRawFd> io::Write for FdWriter<Inner> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = unsafe {
                libc::write(
                    self.inner.as_raw_fd(),
                    buf.as_ptr().cast::<libc::c_void>(),
                    buf.len(),
                )
            };
            if n < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(n as usize)
            }
        }

        #[inline]
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<Inner: AsRawFd> Output for FdWriter<Inner> {
        #[inline]
        fn flushing(&self) -> Flushing {
            Flushing::Sync
        }

        fn sync(&mut self) -> io::Result<()> {
            // `fsync` fails with `EINVAL` on pipes and terminals, which is
            // expected and harmless here.
            if unsafe { libc::fsync(self.inner.as_raw_fd()) } == 0 {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        }
    }

    #[test]
    fn test_fd_writer() {
        use std::{
            fs,
            io::{Read, Seek, SeekFrom, Write},
        };

        let path = std::env::temp_dir().join(format!("aslap-fd-writer-{}", std::process::id()));
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let mut writer = FdWriter::new(file);
        assert_eq!(writer.flushing(), Flushing::Sync);
        assert!(writer.get_ref().metadata().unwrap().is_file());
        writer.write_all("h€".as_bytes()).unwrap();
        writer.sync().unwrap();

        let mut file = writer.into_inner();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        assert_eq!(s, "h€");
        drop(file);
        fs::remove_file(&path).unwrap();
    }
}

#[test]
fn test_capabilities() {
    assert_eq!(Vec::<u8>::new().flushing(), Flushing::Infallible);
    assert_eq!(io::sink().flushing(), Flushing::Noop);
    assert_eq!(io::stdout().flushing(), Flushing::Fallible);
    assert_eq!(BufWriter::new(io::sink()).flushing(), Flushing::Fallible);
    assert_eq!(LineWriter::new(Vec::<u8>::new()).flushing(), Flushing::Fallible);
    assert_eq!((&mut Vec::<u8>::new()).flushing(), Flushing::Infallible);
    assert_eq!(Cursor::new(Vec::<u8>::new()).flushing(), Flushing::Infallible);
    let mut buf = [0_u8; 4];
    assert_eq!((&mut buf[..]).flushing(), Flushing::Infallible);
    assert_eq!(Unflushed::new(io::stdout()).flushing(), Flushing::Noop);
}

#[test]
fn test_unflushed() {
    let mut out = Unflushed::new(Cursor::new(Vec::<u8>::new()));
    io::Write::write_all(&mut out, b"abc").unwrap();
    assert_eq!(out.get_ref().get_ref().as_slice(), b"abc");
    assert_eq!(out.into_inner().into_inner(), b"abc");
}

#[test]
fn test_flush_action_flushes_buffer() {
    let mut out = BufWriter::new(Vec::<u8>::new());
    let (flushing, flush) = flush_action(&out);
    assert_eq!(flushing, Flushing::Fallible);
    io::Write::write_all(&mut out, b"x").unwrap();
    assert!(out.get_ref().is_empty());
    flush(&mut out);
    assert_eq!(out.get_ref().as_slice(), b"x");
}

#[test]
fn test_flush_action_ignores_errors() {
    struct Stubborn;
    impl io::Write for Stubborn {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "can't flush"))
        }
    }
    impl Output for Stubborn {
        fn flushing(&self) -> Flushing {
            Flushing::Fallible
        }
    }

    let mut out = Stubborn;
    let (_, flush) = flush_action(&out);
    flush(&mut out);
}
