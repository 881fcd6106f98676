//! Subjects: course-like groupings of enrolled users and templates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub id:             Uuid,
  pub name:           String,
  pub code:           String,
  #[serde(default)]
  pub professor_name: Option<String>,
  pub professor_mail: String,
}
