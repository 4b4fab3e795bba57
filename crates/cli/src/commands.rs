//! Command dispatch onto the catalog and the workflow.

use clap::{Args, Subcommand};
use mdreg_store::{MdUpdate, Workflow};
use tracing::debug;

use crate::output::Response;

/// Managed domain commands, shared by `store` and the top level
#[derive(Subcommand, Debug)]
pub enum MdCommand {
    /// Add a managed domain; the first name becomes its name
    Add {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List managed domains, most recently changed first
    List,
    /// Remove managed domains
    Remove {
        /// Succeed even if a managed domain does not exist
        #[arg(short = 'f', long = "force")]
        force: bool,

        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Change the domains or the CA of a managed domain
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Name of the managed domain
    pub name: String,

    #[command(subcommand)]
    pub field: Option<UpdateField>,
}

#[derive(Subcommand, Debug)]
pub enum UpdateField {
    /// Replace the domain list
    Domains {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Replace the CA url and optionally the protocol
    Ca { url: String, proto: Option<String> },
}

/// Which rule an update follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Administrative edits, lifecycle state untouched
    Store,
    /// Edits that require the certificate to be obtained again
    Workflow,
}

/// CA settings for a command: from flags for updates, flags or config for adds
#[derive(Debug, Clone, Default)]
pub struct CaSettings {
    pub url: Option<String>,
    pub proto: Option<String>,
}

pub struct Dispatcher {
    workflow: Workflow,
}

impl Dispatcher {
    pub fn new(workflow: Workflow) -> Self {
        Self { workflow }
    }

    /// Run one command
    ///
    /// `add_ca` is used for new managed domains, `flag_ca` holds only what
    /// was given on the command line and is applied to updates.
    pub fn run(
        &self,
        surface: Surface,
        command: MdCommand,
        add_ca: &CaSettings,
        flag_ca: &CaSettings,
    ) -> anyhow::Result<Response> {
        let catalog = self.workflow.catalog();

        match command {
            MdCommand::Add { names } => {
                let md = catalog.add(&names, add_ca.url.as_deref(), add_ca.proto.as_deref())?;
                Ok(Response::ok(vec![md]))
            }
            MdCommand::List => Ok(Response::ok(catalog.list()?)),
            MdCommand::Remove { force, names } => {
                for name in &names {
                    catalog.remove(name, force)?;
                }
                Ok(Response::empty())
            }
            MdCommand::Update(args) => {
                let update = build_update(args.field, flag_ca);
                debug!(
                    name = %args.name,
                    ?surface,
                    ?update,
                    "Updating managed domain"
                );

                let md = match surface {
                    Surface::Store => catalog.update(&args.name, &update)?,
                    Surface::Workflow => self.workflow.update(&args.name, &update)?,
                };
                Ok(Response::ok(vec![md]))
            }
        }
    }
}

/// Combine the update field with `-a`/`-p`, the field taking precedence
fn build_update(field: Option<UpdateField>, flag_ca: &CaSettings) -> MdUpdate {
    let mut update = MdUpdate::new();
    let mut url = flag_ca.url.clone();
    let mut proto = flag_ca.proto.clone();

    match field {
        Some(UpdateField::Domains { names }) => {
            update = update.domains(names);
        }
        Some(UpdateField::Ca {
            url: field_url,
            proto: field_proto,
        }) => {
            url = Some(field_url);
            if field_proto.is_some() {
                proto = field_proto;
            }
        }
        None => {}
    }

    if let Some(url) = url {
        update = update.ca_url(url);
    }
    if let Some(proto) = proto {
        update = update.ca_proto(proto);
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdreg_common::MdState;
    use mdreg_store::{ErrorKind, StoreError};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Dispatcher) {
        let temp_dir = TempDir::new().unwrap();
        let workflow = Workflow::open(temp_dir.path()).unwrap();
        (temp_dir, Dispatcher::new(workflow))
    }

    fn add(names: &[&str]) -> MdCommand {
        MdCommand::Add {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn update(name: &str, field: Option<UpdateField>) -> MdCommand {
        MdCommand::Update(UpdateArgs {
            name: name.to_string(),
            field,
        })
    }

    fn kind(err: anyhow::Error) -> ErrorKind {
        err.downcast_ref::<StoreError>().unwrap().kind()
    }

    #[test]
    fn test_build_update_merges_flags() {
        let flags = CaSettings {
            url: Some("https://flag.example/".to_string()),
            proto: Some("FLAG".to_string()),
        };

        let update = build_update(None, &flags);
        assert_eq!(update.ca_url.as_deref(), Some("https://flag.example/"));
        assert_eq!(update.ca_proto.as_deref(), Some("FLAG"));
        assert!(update.domains.is_none());

        let update = build_update(
            Some(UpdateField::Ca {
                url: "https://field.example/".to_string(),
                proto: None,
            }),
            &flags,
        );
        assert_eq!(update.ca_url.as_deref(), Some("https://field.example/"));
        assert_eq!(update.ca_proto.as_deref(), Some("FLAG"));

        assert!(build_update(None, &CaSettings::default()).is_empty());
    }

    #[test]
    fn test_store_and_workflow_updates() {
        let (_temp_dir, dispatcher) = setup();
        let none = CaSettings::default();

        dispatcher
            .run(Surface::Store, add(&["a.example"]), &none, &none)
            .unwrap();

        let field = || {
            Some(UpdateField::Domains {
                names: vec!["a.example".to_string(), "b.example".to_string()],
            })
        };
        let response = dispatcher
            .run(Surface::Store, update("a.example", field()), &none, &none)
            .unwrap();
        assert_eq!(response.output[0].state, MdState::Stable);

        let response = dispatcher
            .run(
                Surface::Workflow,
                update(
                    "a.example",
                    Some(UpdateField::Ca {
                        url: "https://acme.example/".to_string(),
                        proto: None,
                    }),
                ),
                &none,
                &none,
            )
            .unwrap();
        assert_eq!(response.output[0].state, MdState::Pending);
        assert_eq!(response.output[0].ca.url(), Some("https://acme.example/"));
    }

    #[test]
    fn test_add_uses_default_ca() {
        let (_temp_dir, dispatcher) = setup();
        let defaults = CaSettings {
            url: Some("https://default.example/".to_string()),
            proto: None,
        };

        let response = dispatcher
            .run(
                Surface::Workflow,
                add(&["a.example"]),
                &defaults,
                &CaSettings::default(),
            )
            .unwrap();
        assert_eq!(
            response.output[0].ca.url(),
            Some("https://default.example/")
        );
    }

    #[test]
    fn test_remove_stops_at_first_failure() {
        let (_temp_dir, dispatcher) = setup();
        let none = CaSettings::default();
        dispatcher
            .run(Surface::Workflow, add(&["a.example"]), &none, &none)
            .unwrap();
        dispatcher
            .run(Surface::Workflow, add(&["b.example"]), &none, &none)
            .unwrap();

        let remove = |force| MdCommand::Remove {
            force,
            names: vec![
                "a.example".to_string(),
                "missing.example".to_string(),
                "b.example".to_string(),
            ],
        };

        let err = dispatcher
            .run(Surface::Workflow, remove(false), &none, &none)
            .unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);

        let listed = dispatcher
            .run(Surface::Workflow, MdCommand::List, &none, &none)
            .unwrap();
        assert_eq!(listed.output.len(), 1);
        assert_eq!(listed.output[0].name, "b.example");

        dispatcher
            .run(Surface::Workflow, remove(true), &none, &none)
            .unwrap();
        let listed = dispatcher
            .run(Surface::Workflow, MdCommand::List, &none, &none)
            .unwrap();
        assert!(listed.output.is_empty());
    }
}
