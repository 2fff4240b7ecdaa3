//! TaskPlan domain type
//!
//! A TaskPlan is either an ordered list of executable tasks or a pure
//! conversation reply, never both.

use serde::{Deserialize, Serialize};

use super::Task;
use crate::error::AgentError;

/// Derived difficulty hint, used for logging and pacing only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanComplexity {
    #[default]
    Simple,
    Moderate,
    Complex,
}

impl std::fmt::Display for PlanComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Moderate => write!(f, "moderate"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// A validated plan produced by the Planner, immutable once returned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    /// Unique plan identifier
    pub id: String,

    /// The user prompt this plan was created from
    pub prompt: String,

    /// Ordered atomic tasks; empty iff this is a conversation plan
    pub tasks: Vec<Task>,

    /// Difficulty hint, never a behavior gate
    pub complexity: PlanComplexity,

    /// True iff no task has any dependency
    pub parallelizable: bool,

    /// Present iff this plan is a pure reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_response: Option<String>,
}

impl TaskPlan {
    /// Create an executable plan over `tasks`
    pub fn tasks(id: impl Into<String>, prompt: impl Into<String>, tasks: Vec<Task>, complexity: PlanComplexity) -> Self {
        let parallelizable = tasks.iter().all(|t| t.dependencies.is_empty());
        Self {
            id: id.into(),
            prompt: prompt.into(),
            tasks,
            complexity,
            parallelizable,
            conversation_response: None,
        }
    }

    /// Create a conversation plan carrying only a reply
    pub fn conversation(id: impl Into<String>, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            tasks: Vec::new(),
            complexity: PlanComplexity::Simple,
            parallelizable: false,
            conversation_response: Some(response.into()),
        }
    }

    /// True if this plan is a pure reply with no executable tasks
    pub fn is_conversation(&self) -> bool {
        self.conversation_response.is_some()
    }

    /// Check the structural invariants of the plan
    ///
    /// A conversation plan carries no tasks; an executable plan carries at
    /// least one. Dependencies only point at earlier tasks, and tool-bound
    /// tasks are typed as such.
    pub fn validate(&self) -> Result<(), AgentError> {
        match &self.conversation_response {
            Some(response) => {
                if response.is_empty() {
                    return Err(AgentError::PlanShapeInvalid(
                        "conversation plan with empty response".to_string(),
                    ));
                }
                if !self.tasks.is_empty() {
                    return Err(AgentError::PlanShapeInvalid(
                        "conversation plan must not carry tasks".to_string(),
                    ));
                }
            }
            None => {
                if self.tasks.is_empty() {
                    return Err(AgentError::PlanShapeInvalid("executable plan with no tasks".to_string()));
                }
            }
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            for dep in &task.dependencies {
                if !seen.contains(&dep.as_str()) {
                    return Err(AgentError::PlanShapeInvalid(format!(
                        "task '{}' depends on '{}' which does not appear earlier in the plan",
                        task.id, dep
                    )));
                }
            }
            if !task.tools.is_empty() && task.task_type == super::TaskType::Simple {
                return Err(AgentError::PlanShapeInvalid(format!(
                    "task '{}' carries tools but is typed simple",
                    task.id
                )));
            }
            seen.push(task.id.as_str());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;

    #[test]
    fn test_conversation_plan_validates() {
        let plan = TaskPlan::conversation("plan-1", "What is 2 + 2?", "4");
        assert!(plan.is_conversation());
        assert!(plan.tasks.is_empty());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_empty_conversation_response_rejected() {
        let plan = TaskPlan::conversation("plan-1", "hi", "");
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_executable_plan_requires_tasks() {
        let plan = TaskPlan::tasks("plan-1", "do things", vec![], PlanComplexity::Simple);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_forward_dependency_rejected() {
        let tasks = vec![
            Task::with_tool("t1", "Create a file", "write_file", 1).depends_on("t2"),
            Task::with_tool("t2", "Read it", "read_file", 2),
        ];
        let plan = TaskPlan::tasks("plan-1", "p", tasks, PlanComplexity::Moderate);
        let err = plan.validate().unwrap_err();
        assert_eq!(err.kind(), "plan-shape-invalid");
    }

    #[test]
    fn test_backward_dependency_accepted() {
        let tasks = vec![
            Task::with_tool("t1", "Create a file", "write_file", 1),
            Task::with_tool("t2", "Read it", "read_file", 2).depends_on("t1"),
        ];
        let plan = TaskPlan::tasks("plan-1", "p", tasks, PlanComplexity::Moderate);
        assert!(plan.validate().is_ok());
        assert!(!plan.parallelizable);
    }

    #[test]
    fn test_parallelizable_iff_no_dependencies() {
        let tasks = vec![
            Task::with_tool("t1", "Create a.txt", "write_file", 1),
            Task::with_tool("t2", "Create b.txt", "write_file", 2),
        ];
        let plan = TaskPlan::tasks("plan-1", "p", tasks, PlanComplexity::Moderate);
        assert!(plan.parallelizable);
    }

    #[test]
    fn test_plan_serde_round_trip() {
        let tasks = vec![
            Task::with_tool("t1", "Create report.md", "write_file", 1),
            Task::with_tool("t2", "Read it back", "read_file", 2).depends_on("t1"),
        ];
        let plan = TaskPlan::tasks("plan-1", "Create report.md, then read it back", tasks, PlanComplexity::Complex);
        let json = serde_json::to_string(&plan).unwrap();
        let back: TaskPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, plan.id);
        assert_eq!(back.tasks.len(), 2);
        assert_eq!(back.tasks[1].dependencies, vec!["t1"]);
        assert_eq!(back.complexity, PlanComplexity::Complex);
        assert!(!back.is_conversation());
        assert!(back.validate().is_ok());
    }
}
