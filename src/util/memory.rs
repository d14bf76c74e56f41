use crate::util::Address;
use std::io::Result;

pub fn zero(start: Address, len: usize) {
    let ptr = start.to_mut_ptr();
    wrap_libc_call(&|| unsafe { libc::memset(ptr, 0, len) }, ptr).unwrap()
}

/// Demand-zero mmap:
/// This function guarantees to zero all mapped memory.
pub fn dzmmap(start: Address, size: usize) -> Result<()> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_FIXED;
    let ret = mmap_fixed(start, size, prot, flags);
    if ret.is_ok() {
        #[cfg(not(target_os = "linux"))]
        zero(start, size)
    }
    ret
}

/// Demand-zero mmap that fails if the range overlaps an existing mapping.
pub fn dzmmap_noreplace(start: Address, size: usize) -> Result<()> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_FIXED_NOREPLACE;
    let ret = mmap_fixed(start, size, prot, flags);
    if ret.is_ok() {
        #[cfg(not(target_os = "linux"))]
        zero(start, size)
    }
    ret
}

/// mmap with no swap space reserve:
/// This function only maps the address range, but doesn't occupy any physical memory.
pub fn mmap_noreserve(start: Address, size: usize) -> Result<()> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags =
        libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_FIXED_NOREPLACE | libc::MAP_NORESERVE;
    mmap_fixed(start, size, prot, flags)
}

fn mmap_fixed(start: Address, size: usize, prot: libc::c_int, flags: libc::c_int) -> Result<()> {
    let ptr = start.to_mut_ptr();
    wrap_libc_call(
        &|| unsafe { libc::mmap(start.to_mut_ptr(), size, prot, flags, -1, 0) },
        ptr,
    )
}

pub fn try_munmap(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(&|| unsafe { libc::munmap(start.to_mut_ptr(), size) }, 0)
}

fn wrap_libc_call<T: PartialEq>(f: &dyn Fn() -> T, expect: T) -> Result<()> {
    let ret = f();
    if ret == expect {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_PAGE;

    #[test]
    fn test_dzmmap() {
        let start = unsafe { Address::from_usize(0x6000_0000_0000) };
        let res = dzmmap(start, BYTES_IN_PAGE);
        assert!(res.is_ok());
        unsafe {
            start.store::<usize>(42);
            assert_eq!(start.load::<usize>(), 42);
        }
        assert!(try_munmap(start, BYTES_IN_PAGE).is_ok());
    }
}
