//! Host probes — live device state for the machine we are running on.
//!
//! Platform-specific probing:
//! - Linux: /sys/*, /proc/*, /etc/os-release, mmcli, iwgetid, loginctl
//! - macOS: sysctl, sw_vers, pmset, ipconfig
//!
//! Every external command runs with a deadline; a probe that overruns it
//! reports `ProbeError::Command` and the metric shows "N/A".

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::formatting::{pack_ip, SIGNAL_LEVELS};
use super::probes::*;

/// Android reports this when the SSID can't be read.
const UNKNOWN_SSID: &str = "<unknown ssid>";

pub struct HostProbes {
    timeout: Duration,
}

impl HostProbes {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self { timeout })
    }

    /// Wire every probe to this host.
    pub fn probes(self: &Arc<Self>) -> Probes {
        Probes {
            identity: Some(self.clone()),
            battery: Some(self.clone()),
            carrier: Some(self.clone()),
            connectivity: Some(self.clone()),
            alarm: Some(self.clone()),
            uptime: Some(self.clone()),
        }
    }

    pub fn lock_probe(self: &Arc<Self>) -> Arc<dyn LockProbe> {
        self.clone()
    }

    fn run(&self, program: &str, args: &[&str]) -> ProbeResult<String> {
        run_cmd(program, args, self.timeout)
    }
}

// ═══════════════════════════════════════════════════════════
// IDENTITY
// ═══════════════════════════════════════════════════════════

#[cfg(not(target_os = "macos"))]
impl DeviceIdentity for HostProbes {
    fn model(&self) -> ProbeResult<String> {
        // ARM boards expose a devicetree model; PCs have DMI.
        read_sys_file("/sys/firmware/devicetree/base/model")
            .or_else(|| read_sys_file("/sys/class/dmi/id/product_name"))
            .ok_or(ProbeError::NoReading)
    }

    fn os_version(&self) -> ProbeResult<String> {
        let content = std::fs::read_to_string("/etc/os-release")?;
        parse_os_release_field(&content, "VERSION_ID")
            .or_else(|| parse_os_release_field(&content, "VERSION"))
            .ok_or(ProbeError::NoReading)
    }

    fn build_id(&self) -> ProbeResult<String> {
        let from_release = std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|c| parse_os_release_field(&c, "BUILD_ID"));
        from_release
            .or_else(|| read_sys_file("/proc/sys/kernel/osrelease"))
            .ok_or(ProbeError::NoReading)
    }
}

#[cfg(target_os = "macos")]
impl DeviceIdentity for HostProbes {
    fn model(&self) -> ProbeResult<String> {
        self.run("sysctl", &["-n", "hw.model"]).map(|s| s.trim().to_string())
    }

    fn os_version(&self) -> ProbeResult<String> {
        self.run("sw_vers", &["-productVersion"])
            .map(|s| s.trim().to_string())
    }

    fn build_id(&self) -> ProbeResult<String> {
        self.run("sw_vers", &["-buildVersion"])
            .map(|s| s.trim().to_string())
    }
}

// ═══════════════════════════════════════════════════════════
// BATTERY
// ═══════════════════════════════════════════════════════════

#[cfg(not(target_os = "macos"))]
impl BatteryProbe for HostProbes {
    fn level(&self) -> ProbeResult<Option<i32>> {
        let entries = match std::fs::read_dir("/sys/class/power_supply") {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            let kind = read_sys_file(&dir.join("type").to_string_lossy());
            if kind.as_deref() != Some("Battery") {
                continue;
            }
            if let Some(capacity) = read_sys_file(&dir.join("capacity").to_string_lossy()) {
                let level = capacity.parse::<i32>().map_err(|e| ProbeError::Parse {
                    what: "battery capacity",
                    detail: e.to_string(),
                })?;
                return Ok(Some(level));
            }
        }
        Ok(None)
    }
}

#[cfg(target_os = "macos")]
impl BatteryProbe for HostProbes {
    fn level(&self) -> ProbeResult<Option<i32>> {
        let output = self.run("pmset", &["-g", "batt"])?;
        Ok(parse_pmset_percent(&output))
    }
}

// ═══════════════════════════════════════════════════════════
// CARRIER
// ═══════════════════════════════════════════════════════════

impl CarrierProbe for HostProbes {
    fn operator_name(&self) -> ProbeResult<String> {
        let output = self.run("mmcli", &["-m", "any", "--output-keyvalue"])?;
        parse_mmcli_operator(&output).ok_or(ProbeError::NoReading)
    }
}

// ═══════════════════════════════════════════════════════════
// CONNECTIVITY
// ═══════════════════════════════════════════════════════════

impl ConnectivityProbe for HostProbes {
    fn active_network(&self) -> ProbeResult<Option<ActiveNetwork>> {
        let addresses = ipv4_addresses()?;
        let wireless = self.wireless_interfaces();

        for (iface, rssi) in &wireless {
            if let Some((_, octets)) = addresses.iter().find(|(name, _)| name == iface) {
                let ssid = self
                    .ssid(iface)
                    .unwrap_or_else(|| UNKNOWN_SSID.to_string());
                return Ok(Some(ActiveNetwork {
                    connected: true,
                    kind: NetworkKind::Wifi,
                    ssid,
                    rssi: *rssi,
                    ip_address: pack_ip(*octets),
                    signal_levels: SIGNAL_LEVELS,
                }));
            }
        }

        let wired = addresses
            .iter()
            .find(|(name, octets)| octets[0] != 127 && !wireless.iter().any(|(w, _)| w == name));

        Ok(wired.map(|(name, octets)| ActiveNetwork {
            connected: true,
            kind: classify_interface(name),
            ssid: String::new(),
            rssi: 0,
            ip_address: pack_ip(*octets),
            signal_levels: SIGNAL_LEVELS,
        }))
    }
}

impl HostProbes {
    #[cfg(not(target_os = "macos"))]
    fn wireless_interfaces(&self) -> Vec<(String, i32)> {
        std::fs::read_to_string("/proc/net/wireless")
            .map(|c| parse_proc_net_wireless(&c))
            .unwrap_or_default()
    }

    #[cfg(target_os = "macos")]
    fn wireless_interfaces(&self) -> Vec<(String, i32)> {
        self.run("ipconfig", &["getsummary", "en0"])
            .ok()
            .and_then(|s| parse_summary_field(&s, "RSSI"))
            .and_then(|rssi| rssi.parse().ok())
            .map(|rssi| vec![("en0".to_string(), rssi)])
            .unwrap_or_default()
    }

    #[cfg(not(target_os = "macos"))]
    fn ssid(&self, iface: &str) -> Option<String> {
        self.run("iwgetid", &["-r", iface])
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(target_os = "macos")]
    fn ssid(&self, iface: &str) -> Option<String> {
        self.run("ipconfig", &["getsummary", iface])
            .ok()
            .and_then(|s| parse_summary_field(&s, "SSID"))
    }
}

fn classify_interface(name: &str) -> NetworkKind {
    if name.starts_with("wwan") || name.starts_with("rmnet") || name.starts_with("ppp") {
        NetworkKind::Mobile
    } else if name.starts_with("eth") || name.starts_with("en") {
        NetworkKind::Ethernet
    } else {
        NetworkKind::Other
    }
}

/// IPv4 addresses per interface, octets in wire order.
fn ipv4_addresses() -> ProbeResult<Vec<(String, [u8; 4])>> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: getifaddrs fills `head` with a list we free below.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    let mut out = Vec::new();
    let mut cur = head;
    while !cur.is_null() {
        // SAFETY: `cur` is a live node of the list returned above.
        let ifa = unsafe { &*cur };
        if !ifa.ifa_addr.is_null() {
            let family = unsafe { (*ifa.ifa_addr).sa_family } as i32;
            if family == libc::AF_INET {
                // SAFETY: AF_INET addresses are sockaddr_in.
                let sin = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_in) };
                let name = unsafe { std::ffi::CStr::from_ptr(ifa.ifa_name) }
                    .to_string_lossy()
                    .into_owned();
                out.push((name, sin.sin_addr.s_addr.to_ne_bytes()));
            }
        }
        cur = ifa.ifa_next;
    }

    // SAFETY: `head` came from getifaddrs and is freed exactly once.
    unsafe { libc::freeifaddrs(head) };
    Ok(out)
}

// ═══════════════════════════════════════════════════════════
// ALARM
// ═══════════════════════════════════════════════════════════

#[cfg(not(target_os = "macos"))]
impl AlarmProbe for HostProbes {
    fn next_alarm(&self) -> ProbeResult<Option<DateTime<Utc>>> {
        let raw = match std::fs::read_to_string("/sys/class/rtc/rtc0/wakealarm") {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProbeError::Unavailable)
            }
            Err(e) => return Err(e.into()),
        };
        parse_wakealarm(&raw, Utc::now())
    }
}

#[cfg(target_os = "macos")]
impl AlarmProbe for HostProbes {
    fn next_alarm(&self) -> ProbeResult<Option<DateTime<Utc>>> {
        Err(ProbeError::Unavailable)
    }
}

// ═══════════════════════════════════════════════════════════
// UPTIME
// ═══════════════════════════════════════════════════════════

impl UptimeProbe for HostProbes {
    fn uptime_millis(&self) -> ProbeResult<u64> {
        #[cfg(target_os = "macos")]
        let clock = libc::CLOCK_UPTIME_RAW;
        #[cfg(not(target_os = "macos"))]
        let clock = libc::CLOCK_MONOTONIC;

        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec.
        if unsafe { libc::clock_gettime(clock, &mut ts) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(ts.tv_sec as u64 * 1000 + ts.tv_nsec as u64 / 1_000_000)
    }
}

// ═══════════════════════════════════════════════════════════
// LOCK STATE
// ═══════════════════════════════════════════════════════════

#[cfg(not(target_os = "macos"))]
impl LockProbe for HostProbes {
    fn is_locked(&self) -> ProbeResult<bool> {
        let session = std::env::var("XDG_SESSION_ID").unwrap_or_else(|_| "self".into());
        let output = self.run(
            "loginctl",
            &["show-session", &session, "-p", "LockedHint", "--value"],
        )?;
        parse_locked_hint(&output)
    }
}

#[cfg(target_os = "macos")]
impl LockProbe for HostProbes {
    fn is_locked(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unavailable)
    }
}

// ═══════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════

/// Run a command with a deadline, returning stdout on success.
///
/// Stdout is drained on its own thread while the deadline runs.
fn run_cmd(program: &str, args: &[&str], timeout: Duration) -> ProbeResult<String> {
    let failed = || ProbeError::Command {
        program: program.to_string(),
    };

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| failed())?;

    let mut stdout = child.stdout.take().ok_or_else(failed)?;
    let reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(failed());
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    };

    let output = reader.join().map_err(|_| failed())??;
    if !status.success() {
        return Err(failed());
    }
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Trimmed file contents, `None` if missing or blank.
fn read_sys_file(path: &str) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string())
        .filter(|s| !s.is_empty())
}

fn parse_os_release_field(content: &str, field: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|l| l.split_once('='))
        .find(|(k, _)| k.trim() == field)
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

/// `(interface, signal level dBm)` rows from /proc/net/wireless.
fn parse_proc_net_wireless(content: &str) -> Vec<(String, i32)> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (iface, rest) = line.split_once(':')?;
            let level = rest
                .split_whitespace()
                .nth(2)?
                .trim_end_matches('.')
                .parse::<i32>()
                .ok()?;
            Some((iface.trim().to_string(), level))
        })
        .collect()
}

fn parse_mmcli_operator(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim() == "modem.3gpp.operator-name")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "--")
}

/// Epoch seconds from the RTC wake alarm; blank, zero, or past means unset.
fn parse_wakealarm(raw: &str, now: DateTime<Utc>) -> ProbeResult<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let secs = raw.parse::<i64>().map_err(|e| ProbeError::Parse {
        what: "rtc wakealarm",
        detail: e.to_string(),
    })?;
    Ok(DateTime::from_timestamp(secs, 0).filter(|at| secs > 0 && *at > now))
}

fn parse_locked_hint(output: &str) -> ProbeResult<bool> {
    match output.trim() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(ProbeError::Parse {
            what: "LockedHint",
            detail: other.to_string(),
        }),
    }
}

#[cfg(target_os = "macos")]
fn parse_pmset_percent(output: &str) -> Option<i32> {
    // " -InternalBattery-0 (id=1234)	87%; charging; 1:02 remaining"
    output
        .lines()
        .find(|l| l.contains("InternalBattery"))
        .and_then(|l| l.split('\t').nth(1))
        .and_then(|s| s.split('%').next())
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(target_os = "macos")]
fn parse_summary_field(output: &str, field: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|l| l.split_once(" : "))
        .find(|(k, _)| k.trim() == field)
        .map(|(_, v)| v.trim().to_string())
}
