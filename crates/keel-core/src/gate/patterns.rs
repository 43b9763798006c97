//! Built-in whitelist, danger patterns and sensitive locations.

/// Command prefixes considered safe when no danger pattern matches.
pub const DEFAULT_WHITELIST: &[&str] = &[
    // Inspection
    "ls", "dir", "pwd", "cat", "type", "echo", "printf", "head", "tail", "less", "more", "wc",
    "sort", "uniq", "grep", "find", "locate", "which", "where", "whoami", "hostname", "date",
    "uptime", "df", "du", "free", "ps", "sleep", "man", "help", "history", "clear",
    // File utilities
    "mkdir", "rmdir", "touch", "cp", "copy", "mv", "move", "rm", "del", "erase",
    // Version control
    "git", "hg", "svn",
    // Toolchains
    "npm", "npx", "yarn", "pnpm", "node", "deno", "pip", "pip3", "pipenv", "conda", "python",
    "python3", "cargo", "rustc", "make", "cmake", "gradle", "mvn", "ant", "docker",
    "docker-compose",
    // Network
    "ping", "traceroute", "tracepath", "nslookup", "dig", "host", "curl", "wget",
    // Archives
    "tar", "zip", "unzip", "gzip", "gunzip", "bzip2",
];

/// Regexes matching destructive idioms, paired with a short description.
pub const DEFAULT_DANGER_PATTERNS: &[(&str, &str)] = &[
    (
        concat!(
            r"(?i)\brm\b[^;&|\n]*\s(?:",
            r"-[a-z]*(?:r[a-z]*f|f[a-z]*r)[a-z]*\b",
            r"|(?:-[a-z]*r[a-z]*|--recursive)\b[^;&|\n]*\s(?:-[a-z]*f[a-z]*|--force)\b",
            r"|(?:-[a-z]*f[a-z]*|--force)\b[^;&|\n]*\s(?:-[a-z]*r[a-z]*|--recursive)\b",
            r")",
        ),
        "recursive force delete",
    ),
    (r"(?i)\b(?:del|erase|rd|rmdir)\s+/s\b", "recursive delete"),
    (r"(?i)\bformat\s+[a-z]:", "disk format"),
    (r"(?i)\bmkfs(?:\.[a-z0-9]+)?\b", "filesystem creation"),
    (r"(?i)\bdd\b.*\b(?:if|of)=", "raw device copy"),
    (
        r"(?i)>\s*/dev/(?:sd|hd|vd|xvd|nvme|mmcblk|disk)",
        "raw device write",
    ),
    (
        r"(?i)\bchmod\s+(?:-[a-z]+\s+)*0?777\b",
        "world-writable permissions",
    ),
    (r"(?i)\bchown\b.*\broot\b", "ownership change to root"),
    (
        r"(?i)\|\s*(?:sudo\s+)?(?:\S*/)?(?:env\s+)?(?:sh|bash|zsh|dash|ksh|python[0-9.]*|perl|ruby|node)\b",
        "pipe into interpreter",
    ),
    (r"`[^`]*`", "backtick substitution"),
    (r"\$\([^)]*\)", "command substitution"),
    (
        r"(?i)(?:;|&&|\|\||\n).*\b(?:rm|del|format|mkfs|shred|dd)\b",
        "chained destructive command",
    ),
    (
        r"(?i)>>?\s*/(?:etc|usr|bin|sbin|boot|sys|lib|lib64|proc)(?:/|\b)",
        "redirection into system directory",
    ),
    (r"(?i)\beval\b", "dynamic evaluation"),
    (r"(?i)\bexec\s*\(", "dynamic execution"),
    (r":\(\)\s*\{[^}]*:\s*\|\s*:", "fork bomb"),
];

/// Locations that are refused for any operation when a target starts with
/// them.
pub const SENSITIVE_PREFIXES: &[&str] = &[
    "/etc/passwd",
    "/etc/shadow",
    "/etc/sudoers",
    "/root/",
    "/var/log/",
    "/boot/",
    "/bin/",
    "/sbin/",
    "/usr/bin/",
    "/usr/sbin/",
    "c:\\windows\\",
    "c:\\program files\\",
];

/// Fragments that make a target sensitive wherever they appear.
pub const SENSITIVE_FRAGMENTS: &[&str] = &["/.ssh/", "%appdata%", "%localappdata%"];

pub const RECOMMENDATIONS: &[&str] = &[
    "Review commands before running them",
    "Whitelist only commands you trust",
    "Avoid running code from untrusted sources",
    "Back up data before destructive operations",
    "Test plans in a disposable environment first",
];

pub const COMMAND_MITIGATIONS: &[&str] = &[
    "Avoid destructive commands",
    "Use a safer, narrower alternative",
    "Verify the target before running",
];
