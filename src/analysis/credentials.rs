use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use super::bound::{bound_joined, BoundedPayload};
use super::tabular::{self, Row, TAB};

/// Columns of the plaintext export: basic auth, FTP command/argument, telnet data, frame.
pub const PLAINTEXT_FIELDS: &[&str] = &[
    "http.authbasic",
    "ftp.request.command",
    "ftp.request.arg",
    "telnet.data",
    "frame.number",
];

/// Columns of the Kerberos export.
pub const KERBEROS_FIELDS: &[&str] = &[
    "kerberos.CNameString",
    "kerberos.realm",
    "kerberos.cipher",
    "kerberos.type",
    "kerberos.msg_type",
    "frame.number",
];

const NONE: &str = "None";
const PLAINTEXT_LABEL: &str = "Plaintext Credentials:\n";
const HASHED_LABEL: &str = "\n\nEncrypted/Hashed Credentials:\n";
const RECORD_SEPARATOR: &str = "\n";
/// Room kept per section for its truncation note.
const NOTE_RESERVE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaintextFamily {
    Ftp,
    Telnet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    HttpBasic { username: String, password: String },
    Ftp { username: String, password: String },
    Telnet { username: String, password: String },
    Kerberos { user: String, realm: String, hash: String, etype: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub credential: Credential,
    pub frame: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub plaintext: Vec<CredentialRecord>,
    pub hashed: Vec<CredentialRecord>,
}

enum LoginStep {
    User(String),
    Pass(String),
}

enum Recognized {
    Basic { username: String, password: String },
    Login(PlaintextFamily, LoginStep),
}

impl Credential {
    /// Hash in the format hashcat expects, for Kerberos records.
    pub fn crackable_hash(&self) -> Option<String> {
        match self {
            Credential::Kerberos { user, realm, hash, etype } => Some(format!(
                "$krb5asrep${}${}@{}:{}",
                etype, user, realm, hash
            )),
            _ => None,
        }
    }
    
    /// Offline cracking command. Only RC4 (etype 23) has a mapped hashcat mode.
    pub fn crack_command(&self) -> Option<String> {
        match self {
            Credential::Kerberos { etype, .. } => hashcat_mode(etype)
                .map(|mode| format!("hashcat -m {} hash.txt wordlist.txt", mode)),
            _ => None,
        }
    }
    
    fn login(family: PlaintextFamily, username: String, password: String) -> Self {
        match family {
            PlaintextFamily::Ftp => Credential::Ftp { username, password },
            PlaintextFamily::Telnet => Credential::Telnet { username, password },
        }
    }
}

fn hashcat_mode(etype: &str) -> Option<u32> {
    match etype {
        "23" => Some(18200),
        _ => None,
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.frame.as_deref().unwrap_or("?");
        
        match &self.credential {
            Credential::HttpBasic { username, password } => {
                write!(f, "HTTP Basic Auth: {}:{} (Frame {})", username, password, frame)
            }
            Credential::Ftp { username, password } => {
                write!(f, "FTP: {}:{} (Frame {})", username, password, frame)
            }
            Credential::Telnet { username, password } => {
                write!(f, "Telnet: {}:{} (Frame {})", username, password, frame)
            }
            Credential::Kerberos { user, realm, etype, .. } => {
                write!(f, "Kerberos: {}@{} (etype {}, Frame {})", user, realm, etype, frame)?;
                if let Some(hash) = self.credential.crackable_hash() {
                    write!(f, "\nHash: {}", hash)?;
                }
                match self.credential.crack_command() {
                    Some(command) => write!(f, "\nCracking command: {}", command),
                    None => write!(f, "\nCracking command: no hashcat mode for etype {}", etype),
                }
            }
        }
    }
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty() && self.hashed.is_empty()
    }
    
    pub fn render(&self) -> String {
        self.render_within(usize::MAX)
    }
    
    /// Renders both sections in at most `max_chars` bytes, dropping whole records from
    /// the tail of each list. The hashed section keeps up to half the room when it needs it.
    pub fn render_within(&self, max_chars: usize) -> String {
        let plaintext: Vec<String> = self.plaintext.iter().map(ToString::to_string).collect();
        let hashed: Vec<String> = self.hashed.iter().map(ToString::to_string).collect();
        
        let room = max_chars
            .saturating_sub(PLAINTEXT_LABEL.len() + HASHED_LABEL.len() + 2 * NOTE_RESERVE);
        let hashed_wanted = joined_len(&hashed, RECORD_SEPARATOR);
        let plaintext_room = room - hashed_wanted.min(room / 2);
        
        let plaintext = bound_joined(&plaintext, RECORD_SEPARATOR, plaintext_room);
        let hashed = bound_joined(&hashed, RECORD_SEPARATOR, room - plaintext.text.len());
        
        format!(
            "{}{}{}{}",
            PLAINTEXT_LABEL,
            render_section(plaintext),
            HASHED_LABEL,
            render_section(hashed)
        )
    }
}

fn joined_len(values: &[String], separator: &str) -> usize {
    let separators = values.len().saturating_sub(1) * separator.len();
    values.iter().map(String::len).sum::<usize>() + separators
}

fn render_section(payload: BoundedPayload) -> String {
    if payload.total == 0 {
        return NONE.to_string();
    }
    if !payload.truncated {
        return payload.text;
    }
    
    let note = format!("[{} more credentials truncated]", payload.total - payload.kept);
    if payload.kept == 0 {
        note
    } else {
        format!("{}{}{}", payload.text, RECORD_SEPARATOR, note)
    }
}

/// Pulls credentials out of tshark field exports.
///
/// Plaintext rows are classified by a fixed recognizer order: HTTP Basic first, then a
/// USER/PASS login step for each enabled family in the order given. Login steps are
/// paired by adjacency within a family: a PASS closes the most recent USER. There is no
/// session key in the exported columns, so interleaved sessions can be mis-paired.
pub struct CredentialExtractor {
    families: Vec<PlaintextFamily>,
}

impl Default for CredentialExtractor {
    fn default() -> Self {
        Self::new(&[PlaintextFamily::Ftp, PlaintextFamily::Telnet])
    }
}

impl CredentialExtractor {
    pub fn new(families: &[PlaintextFamily]) -> Self {
        Self {
            families: families.to_vec(),
        }
    }
    
    pub fn extract(&self, plaintext_text: &str, kerberos_text: &str) -> Extraction {
        let extraction = Extraction {
            plaintext: self.plaintext(plaintext_text),
            hashed: self.kerberos(kerberos_text),
        };
        
        log::info!(
            "Extracted {} plaintext and {} hashed credentials",
            extraction.plaintext.len(),
            extraction.hashed.len()
        );
        
        extraction
    }
    
    pub fn plaintext(&self, text: &str) -> Vec<CredentialRecord> {
        let mut records = Vec::new();
        let mut pending_users: HashMap<PlaintextFamily, String> = HashMap::new();
        
        for row in tabular::rows(text, TAB) {
            let frame = frame_of(&row, 4);
            
            match self.recognize(&row) {
                Some(Recognized::Basic { username, password }) => {
                    records.push(CredentialRecord {
                        credential: Credential::HttpBasic { username, password },
                        frame,
                    });
                }
                Some(Recognized::Login(family, LoginStep::User(username))) => {
                    pending_users.insert(family, username);
                }
                Some(Recognized::Login(family, LoginStep::Pass(password))) => {
                    if let Some(username) = pending_users.remove(&family) {
                        records.push(CredentialRecord {
                            credential: Credential::login(family, username, password),
                            frame,
                        });
                    }
                }
                None => {}
            }
        }
        
        records
    }
    
    pub fn kerberos(&self, text: &str) -> Vec<CredentialRecord> {
        tabular::rows(text, TAB)
            .filter_map(|row| {
                let user = tabular::first_value(row.field(0));
                let realm = tabular::first_value(row.field(1));
                let hash = row.field(2).rsplit(',').next().unwrap_or("").trim();
                
                if user.is_empty() || realm.is_empty() || hash.is_empty() {
                    return None;
                }
                
                Some(CredentialRecord {
                    credential: Credential::Kerberos {
                        user: user.to_string(),
                        realm: realm.to_string(),
                        hash: hash.to_string(),
                        etype: parse_etype(row.field(3)),
                    },
                    frame: frame_of(&row, 5),
                })
            })
            .collect()
    }
    
    fn recognize(&self, row: &Row<'_>) -> Option<Recognized> {
        if let Some((username, password)) = basic_auth(row.field(0)) {
            return Some(Recognized::Basic { username, password });
        }
        
        self.families.iter().find_map(|&family| {
            let step = match family {
                PlaintextFamily::Ftp => ftp_step(row.field(1), row.field(2)),
                PlaintextFamily::Telnet => telnet_step(row.field(3)),
            };
            step.map(|step| Recognized::Login(family, step))
        })
    }
}

/// Accepts Base64 `user:pass`, or the already-decoded form tshark prints.
fn basic_auth(field: &str) -> Option<(String, String)> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    
    let decoded = STANDARD
        .decode(field)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    
    decoded
        .as_deref()
        .and_then(split_user_pass)
        .or_else(|| split_user_pass(field))
}

fn split_user_pass(text: &str) -> Option<(String, String)> {
    if text.matches(':').count() != 1 {
        return None;
    }
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn ftp_step(command: &str, arg: &str) -> Option<LoginStep> {
    let arg = arg.trim();
    match command.trim() {
        "USER" if !arg.is_empty() => Some(LoginStep::User(arg.to_string())),
        "PASS" => Some(LoginStep::Pass(arg.to_string())),
        _ => None,
    }
}

fn telnet_step(data: &str) -> Option<LoginStep> {
    let data = data.trim();
    let lower = data.to_ascii_lowercase();
    
    let (is_user, value) = if lower.starts_with("login:") {
        (true, &data["login:".len()..])
    } else if lower.starts_with("password:") {
        (false, &data["password:".len()..])
    } else if let Some(rest) = data.strip_prefix("USER ") {
        (true, rest)
    } else if let Some(rest) = data.strip_prefix("PASS ") {
        (false, rest)
    } else {
        return None;
    };
    
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    
    if is_user {
        Some(LoginStep::User(value.to_string()))
    } else {
        Some(LoginStep::Pass(value.to_string()))
    }
}

/// `23`, `23,18` or `eTYPE-ARCFOUR-HMAC-MD5 (23)` all normalize to `23`.
fn parse_etype(field: &str) -> String {
    let first = tabular::first_value(field);
    
    if first.parse::<i32>().is_ok() {
        return first.to_string();
    }
    
    first
        .rsplit_once('(')
        .and_then(|(_, tail)| tail.strip_suffix(')'))
        .filter(|code| code.parse::<i32>().is_ok())
        .unwrap_or(first)
        .to_string()
}

fn frame_of(row: &Row<'_>, index: usize) -> Option<String> {
    let frame = tabular::first_value(row.field(index));
    if frame.is_empty() {
        None
    } else {
        Some(frame.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_http_basic_from_base64() {
        let records = CredentialExtractor::default().plaintext("YWRtaW46cGFzc3dvcmQxMjM=\t\t\t\t1");
        
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credential, Credential::HttpBasic {
            username: "admin".to_string(),
            password: "password123".to_string(),
        });
        assert_eq!(records[0].frame.as_deref(), Some("1"));
    }
    
    #[test]
    fn test_http_basic_already_decoded() {
        let records = CredentialExtractor::default().plaintext("alice:s3cret\t\t\t\t9");
        
        assert_eq!(records[0].credential, Credential::HttpBasic {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
        });
    }
    
    #[test]
    fn test_basic_requires_single_separator() {
        // base64 of "a:b:c"
        let records = CredentialExtractor::default().plaintext("YTpiOmM=\t\t\t\t1");
        assert!(records.is_empty());
    }
    
    #[test]
    fn test_ftp_pairing() {
        let text = "\tUSER\tftpuser\t\t1\n\tPASS\tftppass\t\t2";
        let records = CredentialExtractor::default().plaintext(text);
        
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credential, Credential::Ftp {
            username: "ftpuser".to_string(),
            password: "ftppass".to_string(),
        });
        assert_eq!(records[0].to_string(), "FTP: ftpuser:ftppass (Frame 2)");
    }
    
    #[test]
    fn test_ftp_commands_case_sensitive() {
        let text = "\tuser\tftpuser\t\t1\n\tpass\tftppass\t\t2";
        assert!(CredentialExtractor::default().plaintext(text).is_empty());
    }
    
    #[test]
    fn test_unpaired_pass_emits_nothing() {
        let text = "\tPASS\tlonely\t\t3\n\tUSER\tnobody\t\t4";
        assert!(CredentialExtractor::default().plaintext(text).is_empty());
    }
    
    #[test]
    fn test_ftp_disabled_family() {
        let text = "\tUSER\tftpuser\t\t1\n\tPASS\tftppass\t\t2";
        let extractor = CredentialExtractor::new(&[PlaintextFamily::Telnet]);
        
        assert!(extractor.plaintext(text).is_empty());
    }
    
    #[test]
    fn test_telnet_pairing() {
        let text = "\t\t\tlogin: bob\t5\n\t\t\tPassword: hunter2\t7";
        let records = CredentialExtractor::default().plaintext(text);
        
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credential, Credential::Telnet {
            username: "bob".to_string(),
            password: "hunter2".to_string(),
        });
    }
    
    #[test]
    fn test_telnet_user_pass_form() {
        let text = "\t\t\tUSER carol\t1\n\t\t\tPASS s3cret\t2";
        let records = CredentialExtractor::default().plaintext(text);
        
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credential, Credential::Telnet {
            username: "carol".to_string(),
            password: "s3cret".to_string(),
        });
        assert_eq!(records[0].frame.as_deref(), Some("2"));
    }
    
    #[test]
    fn test_kerberos_row() {
        let records = CredentialExtractor::default().kerberos("testuser\tTEST.REALM\thashdata123\t23\t11\t1");
        
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credential, Credential::Kerberos {
            user: "testuser".to_string(),
            realm: "TEST.REALM".to_string(),
            hash: "hashdata123".to_string(),
            etype: "23".to_string(),
        });
        
        let command = records[0].credential.crack_command().unwrap();
        assert!(command.contains("hashcat -m 18200"));
        assert_eq!(
            records[0].credential.crackable_hash().as_deref(),
            Some("$krb5asrep$23$testuser@TEST.REALM:hashdata123")
        );
    }
    
    #[test]
    fn test_kerberos_requires_user_realm_hash() {
        let text = "\tTEST.REALM\thash\t23\t11\t1\nuser\t\thash\t23\t11\t2\nuser\tREALM\t\t23\t11\t3";
        assert!(CredentialExtractor::default().kerberos(text).is_empty());
    }
    
    #[test]
    fn test_kerberos_unmapped_etype_kept() {
        let records = CredentialExtractor::default().kerberos("svc\tCORP.LOCAL\tabcd\t18\t11\t4");
        
        assert_eq!(records.len(), 1);
        assert!(records[0].credential.crack_command().is_none());
        assert!(records[0].to_string().contains("no hashcat mode for etype 18"));
    }
    
    #[test]
    fn test_etype_forms() {
        assert_eq!(parse_etype("23"), "23");
        assert_eq!(parse_etype("23,18"), "23");
        assert_eq!(parse_etype("eTYPE-ARCFOUR-HMAC-MD5 (23)"), "23");
        assert_eq!(parse_etype(""), "");
    }
    
    #[test]
    fn test_empty_input_renders_none() {
        let extraction = CredentialExtractor::default().extract("\n", "\n");
        
        assert!(extraction.is_empty());
        assert_eq!(
            extraction.render(),
            "Plaintext Credentials:\nNone\n\nEncrypted/Hashed Credentials:\nNone"
        );
    }
    
    #[test]
    fn test_passes_are_independent() {
        let plaintext = "YWRtaW46cGFzc3dvcmQxMjM=\t\t\t\t1\n\tUSER\tftpuser\t\t2\n\tPASS\tftppass\t\t3";
        let kerberos = "testuser\tTEST.REALM\thashdata123\t23\t11\t4";
        let extraction = CredentialExtractor::default().extract(plaintext, kerberos);
        
        assert_eq!(extraction.plaintext.len(), 2);
        assert_eq!(extraction.hashed.len(), 1);
        
        let rendered = extraction.render();
        assert!(rendered.contains("HTTP Basic Auth: admin:password123 (Frame 1)"));
        assert!(rendered.contains("hashcat -m 18200"));
    }
    
    fn basic(n: usize) -> CredentialRecord {
        CredentialRecord {
            credential: Credential::HttpBasic {
                username: format!("user{}", n),
                password: "password".to_string(),
            },
            frame: Some(n.to_string()),
        }
    }
    
    fn kerberos(n: usize) -> CredentialRecord {
        CredentialRecord {
            credential: Credential::Kerberos {
                user: format!("svc{}", n),
                realm: "CORP.LOCAL".to_string(),
                hash: "ab".repeat(64),
                etype: "23".to_string(),
            },
            frame: Some(n.to_string()),
        }
    }
    
    #[test]
    fn test_render_within_matches_render_when_small() {
        let extraction = Extraction {
            plaintext: vec![basic(1), basic(2)],
            hashed: vec![kerberos(3)],
        };
        
        assert_eq!(extraction.render_within(10_000), extraction.render());
    }
    
    #[test]
    fn test_render_within_keeps_room_for_hashed() {
        let extraction = Extraction {
            plaintext: (0..1000).map(basic).collect(),
            hashed: (0..1000).map(kerberos).collect(),
        };
        
        let text = extraction.render_within(20_000);
        let (plaintext, hashed) = text.split_once("\n\nEncrypted/Hashed Credentials:\n").unwrap();
        
        assert!(text.len() <= 20_000);
        assert!(plaintext.starts_with("Plaintext Credentials:\nHTTP Basic Auth: user0:password (Frame 0)"));
        assert!(plaintext.ends_with("more credentials truncated]"));
        assert!(hashed.starts_with("Kerberos: svc0@CORP.LOCAL"));
        assert!(hashed.ends_with("more credentials truncated]"));
    }
    
    #[test]
    fn test_render_within_tiny_budget_notes_everything() {
        let extraction = Extraction {
            plaintext: vec![basic(1)],
            hashed: Vec::new(),
        };
        
        assert_eq!(
            extraction.render_within(0),
            "Plaintext Credentials:\n[1 more credentials truncated]\n\nEncrypted/Hashed Credentials:\nNone"
        );
    }
}
