// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashSet, fmt};

use moose_core::{Metadata, ResourceId, Schema};
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, register, require_name},
	error::{CatalogError, ResourceKind},
	handler::TaskHandler,
};

pub struct TaskToCreate {
	pub name: String,
	pub handler: TaskHandler,
	/// Tasks started with this task's output once it completes.
	pub on_complete: Vec<TaskToCreate>,
	pub timeout: Option<String>,
	pub retries: Option<u32>,
	pub input_schema: Option<Schema>,
}

impl TaskToCreate {
	pub fn new(name: impl Into<String>, handler: TaskHandler) -> Self {
		Self {
			name: name.into(),
			handler,
			on_complete: vec![],
			timeout: None,
			retries: None,
			input_schema: None,
		}
	}

	pub fn then(mut self, task: TaskToCreate) -> Self {
		self.on_complete.push(task);
		self
	}
}

#[derive(Clone)]
pub struct Task {
	pub name: String,
	pub handler: TaskHandler,
	pub on_complete: Vec<Task>,
	pub timeout: Option<String>,
	pub retries: Option<u32>,
	pub input_schema: Option<Schema>,
}

impl fmt::Debug for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task")
			.field("name", &self.name)
			.field("on_complete", &self.on_complete)
			.field("timeout", &self.timeout)
			.field("retries", &self.retries)
			.finish_non_exhaustive()
	}
}

#[derive(Default)]
pub struct WorkflowToCreate {
	pub name: String,
	pub starting_task: Option<TaskToCreate>,
	pub retries: Option<u32>,
	pub timeout: Option<String>,
	/// Cron expression or interval.
	pub schedule: Option<String>,
	pub metadata: Metadata,
}

impl WorkflowToCreate {
	pub fn new(name: impl Into<String>, starting_task: TaskToCreate) -> Self {
		Self {
			name: name.into(),
			starting_task: Some(starting_task),
			..Default::default()
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowRef {
	pub name: String,
}

#[derive(Debug, Clone)]
pub struct Workflow {
	pub name: String,
	pub starting_task: Task,
	pub retries: Option<u32>,
	pub timeout: Option<String>,
	pub schedule: Option<String>,
	pub metadata: Metadata,
}

impl Workflow {
	/// Every task in execution order: a task before the tasks it starts.
	pub fn tasks(&self) -> Vec<&Task> {
		let mut tasks = vec![];
		let mut pending = vec![&self.starting_task];
		while let Some(task) = pending.pop() {
			tasks.push(task);
			pending.extend(task.on_complete.iter().rev());
		}
		tasks
	}

	pub fn find_task(&self, name: &str) -> Option<&Task> {
		self.tasks().into_iter().find(|task| task.name == name)
	}
}

fn build_task(workflow: &str, to_create: TaskToCreate, seen: &mut HashSet<String>) -> Result<Task> {
	require_name(ResourceKind::Task, &to_create.name)?;
	if !seen.insert(to_create.name.clone()) {
		return Err(CatalogError::AlreadyExists {
			kind: ResourceKind::Task,
			name: format!("{}.{}", workflow, to_create.name),
			version: None,
		}
		.into());
	}
	let on_complete = to_create
		.on_complete
		.into_iter()
		.map(|child| build_task(workflow, child, seen))
		.collect::<Result<Vec<_>>>()?;
	Ok(Task {
		name: to_create.name,
		handler: to_create.handler,
		on_complete,
		timeout: to_create.timeout,
		retries: to_create.retries,
		input_schema: to_create.input_schema,
	})
}

impl Catalog {
	#[instrument(name = "catalog::workflow::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_workflow(&mut self, to_create: WorkflowToCreate) -> Result<WorkflowRef> {
		require_name(ResourceKind::Workflow, &to_create.name)?;
		let Some(starting_task) = to_create.starting_task else {
			return Err(CatalogError::MissingField {
				kind: ResourceKind::Workflow,
				name: to_create.name,
				field: "startingTask",
			}
			.into());
		};
		let starting_task = build_task(&to_create.name, starting_task, &mut HashSet::new())?;

		let id = ResourceId::unversioned(to_create.name.clone());
		let workflow = Workflow {
			name: to_create.name,
			starting_task,
			retries: to_create.retries,
			timeout: to_create.timeout,
			schedule: to_create.schedule,
			metadata: self.resolve_metadata(to_create.metadata),
		};
		let duplicates = self.config.duplicates;
		register(&mut self.workflows, duplicates, ResourceKind::Workflow, &id, id.key(), workflow)?;
		self.touch();
		Ok(WorkflowRef {
			name: id.name,
		})
	}

	pub fn find_workflow(&self, name: &str) -> Option<&Workflow> {
		self.workflows.get(name)
	}

	pub fn list_workflows(&self) -> impl Iterator<Item = &Workflow> {
		self.workflows.values()
	}

	pub fn workflow_count(&self) -> usize {
		self.workflows.len()
	}
}
