use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declares a closed set of values stored as text, with the exact spelling
/// used on the wire and in the database.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::validation(
                        $field,
                        format!("unknown value '{other}'"),
                    )),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum! {
    /// Role of a support-team member.
    AgentRole("role") {
        CustomerService => "Customer Service",
        MigrationSpecialist => "Migration Specialist",
        Trainer => "Trainer",
        Leader => "Leader",
    }
}

text_enum! {
    /// Activation flag shared by agents and campuses.
    ActiveStatus("status") {
        Active => "active",
        Inactive => "inactive",
    }
}

text_enum! {
    /// Unit of an SLA duration.
    SlaUnit("unit") {
        Menit => "Menit",
        Jam => "Jam",
        Hari => "Hari",
    }
}

text_enum! {
    TrainingMethod("method") {
        Online => "Online",
        OfflineOffice => "Offline dikantor",
        OfflineOnsite => "Offline diluar kantor",
    }
}

text_enum! {
    TrainingStatus("status") {
        Backlog => "backlog",
        Todo => "todo",
        InProgress => "inprogress",
        Cancel => "cancel",
        Done => "done",
    }
}

text_enum! {
    /// Workflow state of a migration item.
    MigrationStatus("status") {
        Backlog => "backlog",
        Todo => "todo",
        InProgress => "in_progress",
        InDeployment => "in_deployment",
        CheckingAfter => "checking_after",
        Verifikasi => "verifikasi",
        Cancel => "cancel",
        Completed => "completed",
    }
}

text_enum! {
    /// Workflow state of a customer-service ticket.
    TicketStatus("status") {
        Todo => "todo",
        InProgress => "in_progress",
        Bug => "bug",
        Flip => "flip",
        Finnet => "finnet",
        Completed => "completed",
    }
}

text_enum! {
    /// Portal a print result belongs to.
    Portal("portal") {
        Operator => "Operator",
        Mahasiswa => "Mahasiswa",
    }
}

text_enum! {
    /// Stage of one printed document in an implementation-print record.
    PrintItemStatus("items.status") {
        Backlog => "Backlog",
        SpecInProgress => "In Progress Spesifikasi",
        DevInProgress => "In Progress Dev",
        CampusReview => "In Review Kampus",
        Completed => "Completed",
    }
}

impl MigrationStatus {
    /// `completed` and `cancel` close a migration item.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationStatus::Completed | MigrationStatus::Cancel)
    }
}

impl TrainingStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, TrainingStatus::Done | TrainingStatus::Cancel)
    }
}

impl TicketStatus {
    /// Statuses that count as a resolution and carry a `solved_at`.
    pub fn is_solved(&self) -> bool {
        matches!(
            self,
            TicketStatus::Flip | TicketStatus::Finnet | TicketStatus::Bug | TicketStatus::Completed
        )
    }
}

impl Default for MigrationStatus {
    fn default() -> Self {
        MigrationStatus::Backlog
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        TicketStatus::Todo
    }
}

impl Default for TrainingStatus {
    fn default() -> Self {
        TrainingStatus::Todo
    }
}

impl Default for TrainingMethod {
    fn default() -> Self {
        TrainingMethod::Online
    }
}

impl Default for PrintItemStatus {
    fn default() -> Self {
        PrintItemStatus::Backlog
    }
}

impl Default for ActiveStatus {
    fn default() -> Self {
        ActiveStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_spelling() {
        for s in MigrationStatus::ALL {
            assert_eq!(s.as_str().parse::<MigrationStatus>().unwrap(), *s);
        }
        assert_eq!(
            "Offline dikantor".parse::<TrainingMethod>().unwrap(),
            TrainingMethod::OfflineOffice
        );
    }

    #[test]
    fn test_parse_unknown_is_validation_error() {
        let err = "archived".parse::<TicketStatus>().unwrap_err();
        match err {
            Error::Validation { field, .. } => assert_eq!(field, "status"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_serde_uses_stored_spelling() {
        let json = serde_json::to_string(&AgentRole::MigrationSpecialist).unwrap();
        assert_eq!(json, "\"Migration Specialist\"");
        let unit: SlaUnit = serde_json::from_str("\"Jam\"").unwrap();
        assert_eq!(unit, SlaUnit::Jam);
    }

    #[test]
    fn test_terminal_and_solved_sets() {
        assert!(MigrationStatus::Cancel.is_terminal());
        assert!(!MigrationStatus::Verifikasi.is_terminal());
        assert!(TicketStatus::Bug.is_solved());
        assert!(!TicketStatus::InProgress.is_solved());
        assert!(TrainingStatus::Done.is_closed());
        assert!(!TrainingStatus::InProgress.is_closed());
    }
}
