//! taskflow relation command implementations

use serde::Serialize;

use crate::cli::{load_context, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::relation::{self, LinkType, RelationFilter, TaskRelation};

#[derive(Serialize)]
struct RelationListOutput {
    total: usize,
    relations: Vec<TaskRelation>,
}

fn relation_line(relation: &TaskRelation) -> String {
    format!(
        "{} {} {} {}",
        relation.id,
        relation.src_task,
        relation.link_type.label(),
        relation.dst_task
    )
}

pub fn run_add(globals: &Globals, src: u64, link_type: &str, dst: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let link_type: LinkType = link_type.parse()?;
    let created = ctx
        .storage
        .transaction(|dataset| relation::create(dataset, src, dst, link_type))?;

    let mut human = HumanOutput::new("Relation created");
    human.push_summary("ID", created.id.to_string());
    human.push_summary("Link", relation_line(&created));
    emit_success(ctx.output, "relation add", &created, Some(&human))
}

pub fn run_list(
    globals: &Globals,
    link_type: Option<&str>,
    src: Option<u64>,
    dst: Option<u64>,
) -> Result<()> {
    let ctx = load_context(globals)?;
    let filter = RelationFilter {
        link_type: link_type.map(str::parse::<LinkType>).transpose()?,
        src_task: src,
        dst_task: dst,
    };
    let dataset = ctx.storage.read()?;
    let relations = relation::list(&dataset, &filter);

    let mut human = HumanOutput::new("Relations");
    human.push_summary("Total", relations.len().to_string());
    for relation in &relations {
        human.push_detail(relation_line(relation));
    }

    let output = RelationListOutput {
        total: relations.len(),
        relations,
    };
    emit_success(ctx.output, "relation list", &output, Some(&human))
}

pub fn run_delete(globals: &Globals, id: u64) -> Result<()> {
    let ctx = load_context(globals)?;
    let removed = ctx
        .storage
        .transaction(|dataset| relation::delete(dataset, id))?;

    let mut human = HumanOutput::new(format!("Relation {id} deleted"));
    human.push_summary("Link", relation_line(&removed));
    emit_success(ctx.output, "relation delete", &removed, Some(&human))
}
