//! Resource manager simulator - interactive driver
//!
//! Usage: resource-manager [--disks <n> --cylinders <c,...>] [OPTIONS] --slice <ms> --page-size <words> --memory <words>
//!
//! Commands, one per line:
//!   A          - a process arrives
//!   t          - the running process terminates
//!   T          - the time slice expires
//!   S          - snapshot
//!   p<n> d<n> c<n>  - running process requests printer/disk/cd-rw n
//!   P<n> D<n> C<n>  - printer/disk/cd-rw n completes

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use clap::{App, Arg};
use log::LevelFilter;

use resource_manager::config::check_disk_count;
use resource_manager::io::{Command, format_page_tables, format_snapshot};
use resource_manager::translation::translate;
use resource_manager::{
    AccessMode, DeviceKind, RequestAttrs, SimError, SnapshotTarget, SysConfig, System,
};

fn log_level(verbosity: u64) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn init_logging(verbosity: u64) {
    env_logger::Builder::new()
        .filter_level(log_level(verbosity))
        .format_timestamp(None)
        .init();
}

fn parse_config() -> Result<SysConfig> {
    let matches = App::new("resource-manager")
        .about("Discrete-event simulator of an OS resource manager")
        .arg(
            Arg::with_name("printers")
                .long("printers")
                .takes_value(true)
                .default_value("1")
                .help("Number of printer devices"),
        )
        .arg(
            Arg::with_name("disks")
                .long("disks")
                .takes_value(true)
                .default_value("0")
                .help("Number of disk devices"),
        )
        .arg(
            Arg::with_name("cylinders")
                .long("cylinders")
                .takes_value(true)
                .multiple(true)
                .use_delimiter(true)
                .help("Cylinder count of each disk, comma separated; one value per disk"),
        )
        .arg(
            Arg::with_name("cdrw")
                .long("cdrw")
                .takes_value(true)
                .default_value("1")
                .help("Number of CD/RW devices"),
        )
        .arg(
            Arg::with_name("slice")
                .short("s")
                .long("slice")
                .takes_value(true)
                .required(true)
                .help("Length of a time slice in ms"),
        )
        .arg(
            Arg::with_name("page-size")
                .long("page-size")
                .takes_value(true)
                .required(true)
                .help("Words per page, a power of two"),
        )
        .arg(
            Arg::with_name("memory")
                .short("m")
                .long("memory")
                .takes_value(true)
                .required(true)
                .help("Words of memory, a multiple of the page size"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Log events to stderr (-vv for more detail)"),
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));

    let number = |name: &str| -> Result<u64> {
        let raw = matches.value_of(name).ok_or_else(|| anyhow!("missing --{}", name))?;
        raw.parse()
            .with_context(|| format!("--{} expects a non-negative integer, got {:?}", name, raw))
    };
    let cylinders = match matches.values_of("cylinders") {
        Some(values) => values
            .map(|v| v.parse::<u32>().with_context(|| format!("bad cylinder count {:?}", v)))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    check_disk_count(number("disks")? as usize, &cylinders)?;

    let cfg = SysConfig::new(
        number("printers")? as usize,
        cylinders,
        number("cdrw")? as usize,
        number("slice")?,
        number("page-size")?,
        number("memory")?,
    )?;
    Ok(cfg)
}

/// Line-oriented prompts that re-ask until the answer is well formed.
struct Console<R> {
    input: R,
}

impl<R: BufRead> Console<R> {
    fn read_line(&mut self, msg: &str) -> Result<Option<String>> {
        print!("{}", msg);
        io::stdout().flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn ask(&mut self, msg: &str) -> Result<String> {
        self.read_line(msg)?.ok_or_else(|| anyhow!("input ended mid-command"))
    }

    fn ask_uint(&mut self, msg: &str) -> Result<u64> {
        let mut answer = self.ask(msg)?;
        loop {
            if let Ok(n) = answer.trim().parse() {
                return Ok(n);
            }
            answer = self.ask(" Input a non-negative integer:")?;
        }
    }

    fn ask_bounded(&mut self, msg: &str, below: u64) -> Result<u64> {
        loop {
            let n = self.ask_uint(msg)?;
            if n < below {
                return Ok(n);
            }
        }
    }

    fn ask_hex(&mut self, msg: &str) -> Result<String> {
        let mut answer = self.ask(msg)?;
        while answer.is_empty() || !answer.bytes().all(|b| b.is_ascii_hexdigit()) {
            answer = self.ask(" Input a hexadecimal number:")?;
        }
        Ok(answer)
    }

    fn ask_mode(&mut self) -> Result<AccessMode> {
        loop {
            let answer = self.ask("Input r(ead) or w(rite):")?;
            let mut chars = answer.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if let Some(mode) = AccessMode::from_char(c) {
                    return Ok(mode);
                }
            }
        }
    }
}

fn gather_request<R: BufRead>(
    console: &mut Console<R>,
    sys: &System,
    kind: DeviceKind,
    index: usize,
) -> Result<(u64, RequestAttrs)> {
    let slice = sys.config().slice_len();
    let usage = console.ask_bounded("CPU usage:", slice + 1)?;
    let filename = console.ask("Filename:")?;

    let running = sys.running().ok_or_else(|| anyhow!("no process is running"))?;
    let location = loop {
        let loc = console.ask_hex("Memory location:")?;
        match translate(&loc, running, sys.config()) {
            Ok(_) => break loc,
            Err(e) => println!(" {}", e),
        }
    };

    let mode = match kind {
        DeviceKind::Printer => AccessMode::Write,
        _ => console.ask_mode()?,
    };
    let file_len = match mode {
        AccessMode::Write => Some(console.ask_uint("File length:")?),
        AccessMode::Read => None,
    };
    let cylinder = match kind {
        DeviceKind::Disk => {
            let cylinders = sys.config().disk_cylinders()[index] as u64;
            Some(console.ask_bounded("Cylinder of disk request:", cylinders)? as u32)
        }
        _ => None,
    };

    Ok((
        usage,
        RequestAttrs {
            filename,
            location,
            mode,
            file_len,
            cylinder,
        },
    ))
}

fn snapshot<R: BufRead>(console: &mut Console<R>, sys: &System) -> Result<()> {
    println!(
        "Average CPU time for completed processes: {}",
        sys.stats().average_cpu
    );
    let target = loop {
        let answer = console.ask("Select r,p,c,d,m:")?;
        match answer.as_str() {
            "r" => break SnapshotTarget::Ready,
            "p" => break SnapshotTarget::Device(DeviceKind::Printer),
            "d" => break SnapshotTarget::Device(DeviceKind::Disk),
            "c" => break SnapshotTarget::Device(DeviceKind::CdRw),
            "m" => break SnapshotTarget::Frames,
            _ => {}
        }
    };

    for line in format_snapshot(&sys.snapshot(target)) {
        println!("{}", line);
    }
    if target != SnapshotTarget::Frames {
        for line in format_page_tables(&sys.page_tables(target)) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn execute<R: BufRead>(console: &mut Console<R>, sys: &mut System, cmd: Command) -> Result<()> {
    match cmd {
        Command::Arrive => {
            let mem = console.ask_uint("Size of process (words):")?;
            sys.arrive(mem)?;
        }
        Command::Terminate => {
            if sys.running().is_none() {
                bail!(SimError::NoRunningProcess);
            }
            let usage = console.ask_bounded("CPU usage:", sys.config().slice_len() + 1)?;
            let done = sys.terminate(usage)?;
            println!(
                "Exterminated process {} with total usage {}ms",
                done.pid, done.cpu_time
            );
        }
        Command::Snapshot => snapshot(console, sys)?,
        Command::Timer => sys.timer()?,
        Command::Request(kind, index) => {
            if sys.running().is_none() {
                bail!(SimError::NoRunningProcess);
            }
            sys.devices().check_unit(kind, index)?;
            let (usage, attrs) = gather_request(console, sys, kind, index)?;
            sys.request(kind, index, usage, attrs)?;
        }
        Command::Complete(kind, index) => {
            sys.complete(kind, index)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cfg = parse_config()?;
    let mut sys = System::new(cfg);
    let stdin = io::stdin();
    let mut console = Console { input: stdin.lock() };

    while let Some(line) = console.read_line("#")? {
        let cmd = match Command::parse(&line) {
            Ok(cmd) => cmd,
            Err(_) => {
                println!("Invalid command.");
                continue;
            }
        };
        if let Err(e) = execute(&mut console, &mut sys, cmd) {
            // only rejected events are recoverable
            if !e.is::<SimError>() {
                return Err(e);
            }
            println!("Invalid command. ({})", e);
        }
    }
    Ok(())
}
