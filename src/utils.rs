use chrono::Utc;
use uuid::Uuid;

/// Unique, sortable name for a temporary capture file.
pub fn capture_file_name() -> String {
    format!(
        "shark-probe-{}-{}.pcap",
        Utc::now().format("%Y%m%dT%H%M%S"),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_capture_file_names_unique() {
        let a = capture_file_name();
        let b = capture_file_name();
        
        assert_ne!(a, b);
        assert!(a.starts_with("shark-probe-"));
        assert!(a.ends_with(".pcap"));
    }
}
