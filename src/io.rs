use crate::devices::DeviceKind;
use crate::system::{PageTableDump, ProcessRecord, Snapshot};

/// One operator command. Unit indices are zero-based here; the operator
/// types them one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Arrive,
    Terminate,
    Snapshot,
    Timer,
    Request(DeviceKind, usize),
    Complete(DeviceKind, usize),
}

impl Command {
    /// `A`, `t`, `S`, `T`, lowercase `p3`/`d1`/`c2` to request, uppercase to complete.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        match line {
            "A" => return Ok(Command::Arrive),
            "t" => return Ok(Command::Terminate),
            "S" => return Ok(Command::Snapshot),
            "T" => return Ok(Command::Timer),
            _ => {}
        }

        let mut chars = line.chars();
        let letter = chars.next().ok_or_else(|| "Empty command".to_string())?;
        let kind = DeviceKind::from_char(letter)
            .ok_or_else(|| format!("Unknown command: {}", line))?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Unknown command: {}", line));
        }
        let unit: usize = digits
            .parse()
            .map_err(|_| format!("Invalid unit number: {}", digits))?;
        if unit == 0 {
            return Err(format!("Unit numbers start at 1: {}", line));
        }

        if letter.is_ascii_lowercase() {
            Ok(Command::Request(kind, unit - 1))
        } else {
            Ok(Command::Complete(kind, unit - 1))
        }
    }
}

pub const READY_HEADER: &str = "PID     CPU-Time  Avg-Burst";
pub const DEVICE_HEADER: &str =
    "PID     Filename          Memstart R/W CPU-Time Avg-Burst File-Length Cylinder";
pub const FRAME_HEADER: &str = "Frame PID     Page";
pub const PAGE_TABLE_HEADER: &str = "Page\t\tFrame";

fn device_line(rec: &ProcessRecord) -> String {
    let (filename, addr, mode, len, cyl) = match &rec.request {
        Some(req) => (
            req.filename.as_str(),
            req.phys_addr.as_str(),
            req.mode.as_char().to_string(),
            req.file_len.map_or("-".to_string(), |n| n.to_string()),
            req.cylinder.map_or("-".to_string(), |c| c.to_string()),
        ),
        None => ("", "", String::new(), "-".to_string(), "-".to_string()),
    };
    format!(
        "{:<8}{:<18}{:<9}{:<4}{:<9}{:<10}{:<12}{}",
        rec.pid, filename, addr, mode, rec.cpu_time, rec.avg_burst, len, cyl
    )
}

/// Render a snapshot as a header line followed by one line per record.
pub fn format_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut out = Vec::new();
    match snapshot {
        Snapshot::Ready(records) => {
            out.push(READY_HEADER.to_string());
            for rec in records {
                out.push(format!("{:<8}{:<10}{}", rec.pid, rec.cpu_time, rec.avg_burst));
            }
        }
        Snapshot::Devices { kind, units } => {
            out.push(DEVICE_HEADER.to_string());
            for (n, unit) in units.iter().enumerate() {
                out.push(format!("----{}{}", kind.as_char(), n + 1));
                out.extend(unit.iter().map(device_line));
            }
        }
        Snapshot::Frames(frames) => {
            out.push(FRAME_HEADER.to_string());
            for rec in frames {
                match rec.owner {
                    Some(owner) => {
                        out.push(format!("{:<6}{:<8}{}", rec.frame, owner.pid, owner.page))
                    }
                    None => out.push(format!("{:<6}free", rec.frame)),
                }
            }
        }
    }
    out
}

pub fn format_page_tables(dumps: &[PageTableDump]) -> Vec<String> {
    let mut out = vec![PAGE_TABLE_HEADER.to_string()];
    for dump in dumps {
        out.push(format!("---PID:{}", dump.pid));
        for (page, frame) in dump.frames.iter().enumerate() {
            out.push(format!("{}\t\t{}", page, frame));
        }
    }
    out
}
