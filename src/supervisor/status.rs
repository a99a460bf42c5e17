use serde::Deserialize;

/// Process state as reported by the supervisor. Nothing is stored locally;
/// every query re-reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Unknown,
    Starting,
    Running,
    Stopping,
    Errored,
}

impl ProcessState {
    pub fn from_pm2(status: &str) -> Self {
        match status {
            "online" => ProcessState::Running,
            "launching" | "waiting restart" => ProcessState::Starting,
            "stopping" => ProcessState::Stopping,
            "errored" => ProcessState::Errored,
            _ => ProcessState::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Unknown => "unknown",
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Stopping => "stopping",
            ProcessState::Errored => "errored",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Pm2Env {
    #[serde(default)]
    status: String,
    #[serde(default)]
    exec_mode: String,
    #[serde(default)]
    pm_uptime: Option<i64>,
    #[serde(default)]
    restart_time: u32,
    #[serde(default)]
    watch: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Monit {
    #[serde(default)]
    cpu: f64,
    #[serde(default)]
    memory: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct JlistEntry {
    pm_id: u32,
    name: String,
    #[serde(default)]
    pm2_env: Pm2Env,
    #[serde(default)]
    monit: Monit,
}

/// One tracked process from the supervisor's structured listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pm_id: u32,
    pub name: String,
    /// Raw supervisor status string (`online`, `stopped`, ...)
    pub status: String,
    pub state: ProcessState,
    pub exec_mode: String,
    /// Epoch milliseconds of the last start
    pub uptime_since: Option<i64>,
    pub restarts: u32,
    pub watch: bool,
    pub cpu: f64,
    pub memory: u64,
}

impl From<JlistEntry> for ProcessInfo {
    fn from(entry: JlistEntry) -> Self {
        let watch = match &entry.pm2_env.watch {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Array(a) => !a.is_empty(),
            _ => false,
        };
        Self {
            pm_id: entry.pm_id,
            state: ProcessState::from_pm2(&entry.pm2_env.status),
            status: entry.pm2_env.status,
            exec_mode: entry.pm2_env.exec_mode.trim_end_matches("_mode").to_string(),
            uptime_since: entry.pm2_env.pm_uptime,
            restarts: entry.pm2_env.restart_time,
            watch,
            cpu: entry.monit.cpu,
            memory: entry.monit.memory,
            name: entry.name,
        }
    }
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Structured(Vec<ProcessInfo>),
    /// The structured listing was unreadable; the supervisor's own view was
    /// printed instead.
    Fallback,
}

impl Listing {
    pub fn count_named(&self, name: &str) -> Option<usize> {
        match self {
            Listing::Structured(list) => Some(list.iter().filter(|p| p.name == name).count()),
            Listing::Fallback => None,
        }
    }
}

/// Parse `pm2 jlist` output. pm2 may print a daemon banner before the JSON,
/// which then sits alone on the last line.
pub fn parse_jlist(output: &str) -> serde_json::Result<Vec<ProcessInfo>> {
    let entries: Vec<JlistEntry> = match serde_json::from_str(output.trim()) {
        Ok(entries) => entries,
        Err(e) => {
            let last = output.lines().rev().find(|l| !l.trim().is_empty());
            match last {
                Some(line) if line.trim() != output.trim() => serde_json::from_str(line.trim())?,
                _ => return Err(e),
            }
        }
    };
    Ok(entries.into_iter().map(ProcessInfo::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JLIST: &str = r#"[
        {"pm_id": 0, "name": "api",
         "pm2_env": {"status": "online", "exec_mode": "fork_mode", "pm_uptime": 1700000000000, "restart_time": 2, "watch": true},
         "monit": {"cpu": 1.5, "memory": 52428800}},
        {"pm_id": 1, "name": "worker",
         "pm2_env": {"status": "errored", "exec_mode": "cluster_mode", "restart_time": 10, "watch": false},
         "monit": {"cpu": 0, "memory": 0}}
    ]"#;

    #[test]
    fn test_parse_jlist() {
        let list = parse_jlist(JLIST).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].state, ProcessState::Running);
        assert_eq!(list[0].exec_mode, "fork");
        assert_eq!(list[0].restarts, 2);
        assert!(list[0].watch);
        assert_eq!(list[1].state, ProcessState::Errored);
        assert_eq!(list[1].exec_mode, "cluster");
        assert_eq!(list[1].uptime_since, None);
    }

    #[test]
    fn test_parse_jlist_rejects_text_output() {
        assert!(parse_jlist("[PM2] Spawning PM2 daemon").is_err());
        assert!(parse_jlist("\n[]\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_jlist_skips_daemon_banner() {
        let output = "[PM2] Spawning PM2 daemon with pm2_home=/root/.pm2\n[PM2] PM2 Successfully daemonized\n[]\n";
        assert!(parse_jlist(output).unwrap().is_empty());

        let single_line = JLIST.lines().map(str::trim).collect::<String>();
        let output = format!("[PM2] PM2 Successfully daemonized\n{single_line}\n");
        assert_eq!(parse_jlist(&output).unwrap().len(), 2);
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(ProcessState::from_pm2("online"), ProcessState::Running);
        assert_eq!(ProcessState::from_pm2("launching"), ProcessState::Starting);
        assert_eq!(ProcessState::from_pm2("stopping"), ProcessState::Stopping);
        assert_eq!(ProcessState::from_pm2("stopped"), ProcessState::Unknown);
        assert!(!ProcessState::Errored.is_running());
    }

    #[test]
    fn test_count_named() {
        let listing = Listing::Structured(parse_jlist(JLIST).unwrap());
        assert_eq!(listing.count_named("api"), Some(1));
        assert_eq!(listing.count_named("nope"), Some(0));
        assert_eq!(Listing::Fallback.count_named("api"), None);
    }
}
