use uuid::Uuid;

/// Stable identifier for this machine, derived from its device name.
pub fn machine_id() -> String {
    let name = whoami::devicename();
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_id_is_stable() {
        let id = machine_id();
        assert_eq!(id, machine_id());
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
