//! Common test utilities for nos-process integration tests
//!
//! Host-side stand-ins for the collaborators the process subsystem reaches
//! through traits: an in-memory file system with a console device, address
//! spaces backed by a byte vector, a loader for a toy image format, and a
//! thread host running forked children on `std::thread`.

#![allow(dead_code)]

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use nos_api::{
    AddressSpace, AddressSpaceFactory, Error, Offset, OpenFlags, ProgramLoader, Result,
    TrapFrame, VirtAddr, Vfs, Vnode,
};
use nos_process::{ExecImage, Kernel, Process, ProcessConfig, ThreadHost};

/// Base of every host address space.
pub const USER_BASE: VirtAddr = 0x1000_0000;
/// Size of every host address space; the stack grows down from the end.
pub const USER_SIZE: usize = 64 * 1024;
/// Magic prefix the host loader accepts.
pub const IMAGE_MAGIC: &[u8] = b"NOSX";
/// Entry point reported for every loaded image.
pub const IMAGE_ENTRY: VirtAddr = USER_BASE + 0x100;

// ---------------------------------------------------------------------------
// File system
// ---------------------------------------------------------------------------

/// A regular file held in memory.
pub struct MemFile {
    data: Mutex<Vec<u8>>,
}

impl MemFile {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: Mutex::new(data.to_vec()),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Vnode for MemFile {
    fn read_at(&self, offset: Offset, buf: &mut [u8]) -> Result<usize> {
        let data = self.data.lock().unwrap();
        let start = usize::try_from(offset).map_err(|_| Error::InvalidArgument)?;
        if start >= data.len() {
            return Ok(0);
        }
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }

    fn write_at(&self, offset: Offset, buf: &[u8]) -> Result<usize> {
        let mut data = self.data.lock().unwrap();
        let start = usize::try_from(offset).map_err(|_| Error::InvalidArgument)?;
        if data.len() < start + buf.len() {
            data.resize(start + buf.len(), 0);
        }
        data[start..start + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn size(&self) -> Result<Offset> {
        Ok(self.data.lock().unwrap().len() as Offset)
    }
}

/// The console: reads drain a queued input buffer, writes append to an
/// output log, and seeking is refused.
#[derive(Default)]
pub struct Console {
    input: Mutex<Vec<u8>>,
    output: Mutex<Vec<u8>>,
}

impl Console {
    pub fn feed(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend_from_slice(bytes);
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock().unwrap()).into_owned()
    }
}

impl Vnode for Console {
    fn read_at(&self, _offset: Offset, buf: &mut [u8]) -> Result<usize> {
        let mut input = self.input.lock().unwrap();
        let count = buf.len().min(input.len());
        buf[..count].copy_from_slice(&input[..count]);
        input.drain(..count);
        Ok(count)
    }

    fn write_at(&self, _offset: Offset, buf: &[u8]) -> Result<usize> {
        self.output.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn is_seekable(&self) -> bool {
        false
    }

    fn size(&self) -> Result<Offset> {
        Ok(0)
    }
}

pub struct MemDir;

impl Vnode for MemDir {
    fn read_at(&self, _offset: Offset, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::InvalidArgument)
    }

    fn write_at(&self, _offset: Offset, _buf: &[u8]) -> Result<usize> {
        Err(Error::InvalidArgument)
    }

    fn size(&self) -> Result<Offset> {
        Ok(0)
    }

    fn is_dir(&self) -> bool {
        true
    }
}

/// In-memory file system with a flat namespace of absolute paths.
pub struct MemFs {
    files: Mutex<BTreeMap<String, Arc<MemFile>>>,
    dirs: Mutex<BTreeSet<String>>,
    pub console: Arc<Console>,
    pub opens: AtomicUsize,
}

impl MemFs {
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(String::from("/"));
        Self {
            files: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(dirs),
            console: Arc::new(Console::default()),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn add_file(&self, path: &str, data: &[u8]) -> Arc<MemFile> {
        let file = Arc::new(MemFile::new(data));
        self.files
            .lock()
            .unwrap()
            .insert(String::from(path), file.clone());
        file
    }

    pub fn add_dir(&self, path: &str) {
        self.dirs.lock().unwrap().insert(String::from(path));
    }

    pub fn file(&self, path: &str) -> Option<Arc<MemFile>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl Vfs for MemFs {
    fn open(&self, path: &str, flags: OpenFlags, _mode: u32) -> Result<Arc<dyn Vnode>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if path == "con:" {
            return Ok(self.console.clone());
        }
        if self.dirs.lock().unwrap().contains(path) {
            return Ok(Arc::new(MemDir));
        }

        let mut files = self.files.lock().unwrap();
        if let Some(file) = files.get(path) {
            if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) {
                return Err(Error::Exists);
            }
            if flags.contains(OpenFlags::O_TRUNC) {
                file.data.lock().unwrap().clear();
            }
            return Ok(file.clone());
        }
        if !flags.contains(OpenFlags::O_CREAT) {
            return Err(Error::NotFound);
        }
        let file = Arc::new(MemFile::new(&[]));
        files.insert(String::from(path), file.clone());
        Ok(file)
    }

    fn open_dir(&self, path: &str) -> Result<Arc<dyn Vnode>> {
        if self.dirs.lock().unwrap().contains(path) {
            return Ok(Arc::new(MemDir));
        }
        if self.files.lock().unwrap().contains_key(path) {
            return Err(Error::NotDirectory);
        }
        Err(Error::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Address spaces
// ---------------------------------------------------------------------------

/// Activation events observed across every host address space.
#[derive(Default)]
pub struct MmuLog {
    next_id: AtomicUsize,
    active: Mutex<Option<usize>>,
    live: AtomicUsize,
}

impl MmuLog {
    /// Id of the address space currently activated, if any.
    pub fn active(&self) -> Option<usize> {
        *self.active.lock().unwrap()
    }

    /// Address spaces created and not yet dropped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// An address space backed by one flat byte vector at `USER_BASE`.
pub struct HostSpace {
    pub id: usize,
    bytes: Vec<u8>,
    mmu: Arc<MmuLog>,
}

impl HostSpace {
    pub fn new(mmu: Arc<MmuLog>) -> Self {
        let id = mmu.next_id.fetch_add(1, Ordering::SeqCst);
        mmu.live.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            bytes: vec![0; USER_SIZE],
            mmu,
        }
    }

    fn range(&self, addr: VirtAddr, len: usize) -> Result<std::ops::Range<usize>> {
        let start = addr.checked_sub(USER_BASE).ok_or(Error::Fault)?;
        let end = start.checked_add(len).ok_or(Error::Fault)?;
        if end > self.bytes.len() {
            return Err(Error::Fault);
        }
        Ok(start..end)
    }
}

impl AddressSpace for HostSpace {
    fn copy(&self) -> Result<Box<dyn AddressSpace>> {
        let mut copy = HostSpace::new(self.mmu.clone());
        copy.bytes.copy_from_slice(&self.bytes);
        Ok(Box::new(copy))
    }

    fn activate(&self) {
        *self.mmu.active.lock().unwrap() = Some(self.id);
    }

    fn deactivate(&self) {
        let mut active = self.mmu.active.lock().unwrap();
        if *active == Some(self.id) {
            *active = None;
        }
    }

    fn define_stack(&mut self) -> Result<VirtAddr> {
        Ok(USER_BASE + USER_SIZE)
    }

    fn check_range(&self, addr: VirtAddr, len: usize, _write: bool) -> Result<()> {
        self.range(addr, len).map(drop)
    }

    fn copyin(&self, src: VirtAddr, dst: &mut [u8]) -> Result<()> {
        let range = self.range(src, dst.len())?;
        dst.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn copyout(&mut self, src: &[u8], dst: VirtAddr) -> Result<()> {
        let range = self.range(dst, src.len())?;
        self.bytes[range].copy_from_slice(src);
        Ok(())
    }
}

impl Drop for HostSpace {
    fn drop(&mut self) {
        self.mmu.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct HostVm {
    pub mmu: Arc<MmuLog>,
    pub fail_create: AtomicBool,
}

impl HostVm {
    pub fn new() -> Self {
        Self {
            mmu: Arc::new(MmuLog::default()),
            fail_create: AtomicBool::new(false),
        }
    }

    pub fn space(&self) -> Box<dyn AddressSpace> {
        Box::new(HostSpace::new(self.mmu.clone()))
    }
}

impl AddressSpaceFactory for HostVm {
    fn create(&self) -> Result<Box<dyn AddressSpace>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        Ok(self.space())
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Loads images that start with `IMAGE_MAGIC` by copying them to
/// `USER_BASE`; anything else is rejected as not executable.
pub struct HostLoader;

impl ProgramLoader for HostLoader {
    fn load(&self, image: &dyn Vnode, space: &mut dyn AddressSpace) -> Result<VirtAddr> {
        let size = image.size()? as usize;
        let mut bytes = vec![0u8; size];
        let read = image.read_at(0, &mut bytes)?;
        if !bytes[..read].starts_with(IMAGE_MAGIC) {
            return Err(Error::NotSupported);
        }
        space.copyout(&bytes[..read], USER_BASE)?;
        Ok(IMAGE_ENTRY)
    }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// Unwind payload used to end a host thread from `exit_thread`.
pub struct ThreadExited;

/// Unwind payload carrying the image handed to `enter_user`.
pub struct EnteredUser(pub ExecImage);

type ChildBody = Arc<dyn Fn(Arc<Process>, TrapFrame) + Send + Sync>;

/// Runs every forked child on its own `std::thread`.
///
/// The body each child executes is set by the test with
/// [`HostThreads::set_body`]; without one the child returns immediately.
pub struct HostThreads {
    body: Mutex<Option<ChildBody>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    pub fail_fork: AtomicBool,
    pub forked: AtomicUsize,
}

impl HostThreads {
    pub fn new() -> Self {
        Self {
            body: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
            fail_fork: AtomicBool::new(false),
            forked: AtomicUsize::new(0),
        }
    }

    pub fn set_body<F>(&self, body: F)
    where
        F: Fn(Arc<Process>, TrapFrame) + Send + Sync + 'static,
    {
        *self.body.lock().unwrap() = Some(Arc::new(body));
    }

    /// Wait for every child thread started so far.
    pub fn join_all(&self) {
        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            handle.join().expect("child thread panicked");
        }
    }
}

/// Run `f` the way a host thread runs, treating `exit_thread` as a normal
/// end of the thread. Any other panic is propagated.
pub fn run_thread<F: FnOnce()>(f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        if !payload.is::<ThreadExited>() {
            panic::resume_unwind(payload);
        }
    }
}

/// Run `f`, returning the image it passed to `enter_user`.
pub fn expect_enter_user<F: FnOnce()>(f: F) -> ExecImage {
    let payload: Box<dyn Any + Send> = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("enter_user was never called"),
        Err(payload) => payload,
    };
    match payload.downcast::<EnteredUser>() {
        Ok(entered) => entered.0,
        Err(other) => panic::resume_unwind(other),
    }
}

impl ThreadHost for HostThreads {
    fn fork_thread(&self, process: Arc<Process>, frame: TrapFrame) -> Result<()> {
        if self.fail_fork.load(Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        self.forked.fetch_add(1, Ordering::SeqCst);
        let body = self.body.lock().unwrap().clone();
        let handle = std::thread::spawn(move || {
            if let Some(body) = body {
                run_thread(|| body(process, frame));
            }
        });
        self.handles.lock().unwrap().push(handle);
        Ok(())
    }

    fn exit_thread(&self) -> ! {
        panic::resume_unwind(Box::new(ThreadExited))
    }

    fn enter_user(&self, image: ExecImage) -> ! {
        panic::resume_unwind(Box::new(EnteredUser(image)))
    }
}

// ---------------------------------------------------------------------------
// Boot
// ---------------------------------------------------------------------------

/// A kernel wired to host collaborators, plus handles on each of them.
pub struct TestKernel {
    pub kernel: Arc<Kernel>,
    pub fs: Arc<MemFs>,
    pub vm: Arc<HostVm>,
    pub threads: Arc<HostThreads>,
}

impl TestKernel {
    pub fn boot() -> Self {
        Self::boot_with(ProcessConfig::default())
    }

    pub fn boot_with(config: ProcessConfig) -> Self {
        let fs = Arc::new(MemFs::new());
        let vm = Arc::new(HostVm::new());
        let threads = Arc::new(HostThreads::new());
        let kernel = Kernel::new(
            config,
            fs.clone(),
            vm.clone(),
            Arc::new(HostLoader),
            threads.clone(),
        )
        .expect("Failed to boot kernel");
        Self {
            kernel: Arc::new(kernel),
            fs,
            vm,
            threads,
        }
    }

    /// Weak handle for child bodies, so the kernel is not kept alive by its
    /// own thread host.
    pub fn weak_kernel(&self) -> Weak<Kernel> {
        Arc::downgrade(&self.kernel)
    }

    /// Spawn a user process with console stdio and a fresh address space.
    pub fn user_process(&self, name: &str) -> Arc<Process> {
        let process = self
            .kernel
            .spawn_runprogram(name)
            .expect("Failed to spawn process");
        let image = format!("/bin/{name}");
        self.fs.add_file(&image, IMAGE_MAGIC);
        self.kernel
            .exec(&process, &image, &[String::from(name)])
            .expect("Failed to exec process image");
        process
    }

    /// A child body that exits with `code` immediately.
    pub fn exit_with(&self, code: i32) {
        let kernel = self.weak_kernel();
        self.threads.set_body(move |child, frame| {
            assert_eq!(frame.ret, 0);
            let kernel = kernel.upgrade().expect("kernel dropped");
            kernel.exit(&child, code);
            kernel.threads().exit_thread();
        });
    }
}
