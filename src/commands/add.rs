//! `add`: save a new connection target.

use tracing::debug;

use crate::cli::AddArgs;
use crate::config::Config;
use crate::credential::{Prompter, ask_optional, ask_required};
use crate::error::AppError;
use crate::registry::{Registry, RegistryError, TargetRecord};
use crate::status;

/// Adds a target, asking for any field not given on the command line.
pub fn run<P: Prompter + ?Sized>(
    config: &Config,
    args: AddArgs,
    prompter: &mut P,
) -> Result<(), AppError> {
    let mut registry = Registry::open(config.servers_file.clone())?;
    let record = collect_record(args, &registry, prompter)?;

    let id = record.id.clone();
    registry.add(record)?;
    status::added(&format!(
        "Saved target '{}' to {}",
        id,
        registry.path().display()
    ));
    Ok(())
}

/// Builds the record from flags and answers.
///
/// With both `--id` and `--host` given, only a username that is actually
/// required is asked for.
fn collect_record<P: Prompter + ?Sized>(
    args: AddArgs,
    registry: &Registry,
    prompter: &mut P,
) -> Result<TargetRecord, AppError> {
    let interactive = args.id.is_none() || args.host.is_none();

    let id = match args.id {
        Some(id) => id,
        None => ask_required(prompter, &status::question("Target id: "))?,
    };
    if registry.contains(&id) {
        return Err(RegistryError::DuplicateId(id).into());
    }

    let secret_ref = match args.secret_ref {
        Some(r) => Some(r),
        None if interactive => ask_optional(
            prompter,
            &status::question("Bitwarden entry name (Enter to skip): "),
        )?,
        None => None,
    };

    let username = match (args.username, &secret_ref) {
        (Some(u), _) => Some(u),
        (None, None) => Some(ask_required(prompter, &status::question("Username: "))?),
        (None, Some(_)) if interactive => ask_optional(
            prompter,
            &status::question("Username (Enter to use the entry's): "),
        )?,
        (None, Some(_)) => None,
    };

    let host = match args.host {
        Some(h) => h,
        None => ask_required(prompter, &status::question("Host or IP: "))?,
    };

    debug!("Collected target '{}'", id);
    Ok(TargetRecord {
        id,
        username,
        host,
        secret_ref,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::prompt::tests::ScriptedPrompter;
    use crate::credential::PromptError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(dir: &tempfile::TempDir) -> Config {
        Config::from_sources(dir.path().to_path_buf(), &HashMap::new())
    }

    #[test]
    fn test_interactive_add_with_secret() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let mut prompter = ScriptedPrompter::new(&["prod", "prod-cred", "", "192.168.50.5"], &[]);

        run(&config, AddArgs::default(), &mut prompter).unwrap();

        let registry = Registry::open(config.servers_file.clone()).unwrap();
        assert_eq!(
            registry.find("prod").unwrap(),
            &TargetRecord::new("prod", "192.168.50.5").with_secret_ref("prod-cred")
        );
    }

    #[test]
    fn test_username_required_without_secret() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let mut prompter = ScriptedPrompter::new(&["jump1", "", "", "u", "203.0.113.10"], &[]);

        run(&config, AddArgs::default(), &mut prompter).unwrap();

        let registry = Registry::open(config.servers_file.clone()).unwrap();
        assert_eq!(registry.find("jump1").unwrap().username(), Some("u"));
    }

    #[test]
    fn test_flags_skip_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let mut prompter = ScriptedPrompter::new(&[], &[]);
        let args = AddArgs {
            id: Some("prod".to_string()),
            host: Some("h".to_string()),
            username: None,
            secret_ref: Some("prod-cred".to_string()),
        };

        run(&config, args, &mut prompter).unwrap();
        assert!(prompter.labels.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected_before_other_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let args = AddArgs {
            id: Some("a".to_string()),
            host: Some("h".to_string()),
            username: Some("u".to_string()),
            secret_ref: None,
        };
        run(&config, args, &mut ScriptedPrompter::new(&[], &[])).unwrap();

        let mut prompter = ScriptedPrompter::new(&["a"], &[]);
        let err = run(&config, AddArgs::default(), &mut prompter).unwrap_err();
        assert!(matches!(err, AppError::Registry(RegistryError::DuplicateId(_))));
        assert_eq!(prompter.labels.len(), 1);
    }

    #[test]
    fn test_end_of_input_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let err = run(&config, AddArgs::default(), &mut ScriptedPrompter::new(&[], &[]))
            .unwrap_err();
        assert!(matches!(err, AppError::Prompt(PromptError::Cancelled)));
        assert!(!config.servers_file.exists());
    }
}
