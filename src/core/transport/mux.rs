//! GSM 07.10 multiplexer attach (n_gsm line discipline)

use super::TransportError;
use std::os::fd::RawFd;

/// Line discipline number of n_gsm
pub const N_GSM0710: libc::c_int = 21;

/// Layout of `struct gsm_config` from `linux/gsmmux.h`; fields keep the
/// kernel names
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GsmConfig {
    pub adaption: libc::c_uint,
    pub encapsulation: libc::c_uint,
    pub initiator: libc::c_uint,
    pub t1: libc::c_uint,
    pub t2: libc::c_uint,
    pub t3: libc::c_uint,
    pub n2: libc::c_uint,
    pub mru: libc::c_uint,
    pub mtu: libc::c_uint,
    pub k: libc::c_uint,
    pub i: libc::c_uint,
    pub unused: [libc::c_uint; 8],
}

nix::ioctl_write_ptr_bad!(tiocsetd, libc::TIOCSETD, libc::c_int);
nix::ioctl_read!(gsmioc_getconf, b'G', 0, GsmConfig);
nix::ioctl_write_ptr!(gsmioc_setconf, b'G', 1, GsmConfig);

/// 07.10 timers and retry count, in the units of the modem and n_gsm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxTimers {
    /// Acknowledgement timer (10 ms units)
    pub t1: u32,
    /// Maximum retransmissions
    pub n2: u32,
    /// Control channel response timer (10 ms units)
    pub t2: u32,
    /// Wake up response timer (seconds)
    pub t3: u32,
    /// Window size (advanced option only, still sent to the modem)
    pub k: u32,
}

impl Default for MuxTimers {
    fn default() -> Self {
        Self {
            t1: 10,
            n2: 3,
            t2: 30,
            t3: 10,
            k: 2,
        }
    }
}

/// Negotiated multiplexer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxParams {
    /// Maximum frame size, used for both MRU and MTU
    pub mtu: u16,
    /// Modem port speed class for `AT+CMUX` (5 = 115200, 6 = 230400, 7 = 1 Mbit)
    pub baud_class: u8,
    /// Timer set
    pub timers: MuxTimers,
}

impl MuxParams {
    /// Basic-option parameters with the default timer set
    pub fn new(mtu: u16, baud_class: u8) -> Self {
        Self {
            mtu,
            baud_class,
            timers: MuxTimers::default(),
        }
    }

    /// The `AT+CMUX` command enabling basic option mode with these parameters
    pub fn cmux_command(&self) -> String {
        let t = &self.timers;
        format!(
            "AT+CMUX=0,0,{},{},{},{},{},{},{}",
            self.baud_class, self.mtu, t.t1, t.n2, t.t2, t.t3, t.k
        )
    }

    /// Apply these parameters to a configuration read from the kernel
    pub fn apply(&self, conf: &mut GsmConfig) {
        conf.initiator = 1;
        conf.encapsulation = 0;
        conf.mru = u32::from(self.mtu);
        conf.mtu = u32::from(self.mtu);
        conf.t1 = self.timers.t1;
        conf.n2 = self.timers.n2;
        conf.t2 = self.timers.t2;
        conf.t3 = self.timers.t3;
    }
}

/// Attach n_gsm to `fd` and configure it as initiator
pub(super) fn attach(fd: RawFd, params: &MuxParams) -> Result<(), TransportError> {
    let ldisc = N_GSM0710;
    // SAFETY: `fd` is an open tty and `ldisc` lives across the call.
    unsafe { tiocsetd(fd, &ldisc) }.map_err(|source| TransportError::ModeSwitch {
        context: "Cannot set N_GSM0710 line discipline. Is 'n_gsm' kernel module registered?",
        source,
    })?;

    let mut conf = GsmConfig::default();
    // SAFETY: `conf` matches the kernel layout and is writable for the call.
    unsafe { gsmioc_getconf(fd, &mut conf) }.map_err(|source| TransportError::ModeSwitch {
        context: "Cannot get GSM multiplex parameters",
        source,
    })?;

    params.apply(&mut conf);

    // SAFETY: as above, read only by the kernel.
    unsafe { gsmioc_setconf(fd, &conf) }.map_err(|source| TransportError::ModeSwitch {
        context: "Cannot set GSM multiplex parameters",
        source,
    })?;

    tracing::debug!(
        "Line discipline set (mtu {}, t1 {}, n2 {}, t2 {}, t3 {})",
        conf.mtu,
        conf.t1,
        conf.n2,
        conf.t2,
        conf.t3
    );
    Ok(())
}
