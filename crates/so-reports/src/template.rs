//! Printable HTML report of an order

use handlebars::{handlebars_helper, Handlebars};
use serde_json::{json, Value};
use so_models::{parse_order_date, OrderAggregate};

use crate::error::{ReportError, ReportResult};

const NOT_INFORMED: &str = "Não informado";

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>Relatório do Serviço #{{service.id}}</title>
<style>
  @page { size: A4; margin: 0; }
  body { font-family: Arial, Helvetica, sans-serif; font-size: 12px; color: #1f2937; margin: 0; padding: 24px; }
  .print-title { text-align: center; font-size: 18px; font-weight: bold; border-bottom: 3px solid #d97706; padding-bottom: 8px; margin-bottom: 16px; }
  section { border: 1px solid #d97706; border-radius: 2px; padding: 12px 16px; margin-bottom: 12px; page-break-inside: avoid; }
  h2 { font-size: 13px; margin: 0 0 8px 0; display: flex; justify-content: space-between; }
  .status { font-size: 11px; font-weight: normal; background: #f1f5f9; padding: 2px 8px; border-radius: 8px; }
  .fields { display: grid; grid-template-columns: 1fr 1fr; gap: 6px 16px; }
  .field label { display: block; font-size: 11px; color: #6b7280; }
  .field p { margin: 2px 0 0 0; background: #f3f4f6; padding: 4px 6px; }
  table { width: 100%; border-collapse: collapse; }
  th, td { text-align: left; padding: 4px 6px; border-bottom: 1px solid #e5e7eb; vertical-align: top; }
  th { font-size: 11px; color: #6b7280; }
  .empty { color: #9ca3af; font-style: italic; }
  .observation { border-left: 3px solid #d97706; padding: 4px 8px; margin-bottom: 6px; }
  .observation small { color: #6b7280; }
</style>
</head>
<body>
<div class="print-title">RELATÓRIO DE SERVIÇO</div>

<section>
  <h2><span>Informações do Serviço</span>{{#if service.status}}<span class="status">{{service.status}}</span>{{/if}}</h2>
  <div class="fields">
    <div class="field"><label>Nome do Serviço</label><p>{{or_default service.type}}</p></div>
    <div class="field"><label>PS</label><p>{{or_default service.ps}}</p></div>
    <div class="field"><label>Responsável</label><p>{{or_default service.responsible}}</p></div>
    <div class="field"><label>Criado em</label><p>{{date_br service.created_at}}</p></div>
    <div class="field"><label>Data de Início</label><p>{{date_br service.start_date}}</p></div>
    <div class="field"><label>Data de Término</label><p>{{date_br service.end_date}}</p></div>
    <div class="field"><label>Tempo estimado</label><p>{{estimated_minutes}} min</p></div>
  </div>
</section>

<section>
  <h2><span>Equipe</span></h2>
  {{#if service.service_team}}
  <table>
    <tr><th>Nome</th><th>Cargo</th><th>Contato</th></tr>
    {{#each service.service_team}}
    <tr><td>{{team.name}}</td><td>{{or_default team.position}}</td><td>{{or_default team.primary_contact}}</td></tr>
    {{/each}}
  </table>
  {{else}}<p class="empty">Nenhum membro da equipe</p>{{/if}}
</section>

<section>
  <h2><span>Procedimentos</span></h2>
  {{#if service.procedure_order}}
  <table>
    <tr><th>#</th><th>Procedimento</th><th>Descrição</th><th>Tempo (min)</th></tr>
    {{#each service.procedure_order}}
    <tr><td>{{execution_order}}</td><td>{{procedure.name}}</td><td>{{or_default procedure.description}}</td><td>{{or_default procedure.estimated_time}}</td></tr>
    {{/each}}
  </table>
  {{else}}<p class="empty">Nenhum procedimento</p>{{/if}}
</section>

<section>
  <h2><span>Materiais</span></h2>
  {{#if service.service_materials}}
  <table>
    <tr><th>Material</th><th>Quantidade</th><th>Unidade</th></tr>
    {{#each service.service_materials}}
    <tr><td>{{material.name}}</td><td>{{quantity}}</td><td>{{or_default material.unity_of_measure}}</td></tr>
    {{/each}}
  </table>
  {{else}}<p class="empty">Nenhum material</p>{{/if}}
</section>

<section>
  <h2><span>Equipamentos</span></h2>
  {{#if service.service_equipments}}
  <table>
    <tr><th>Equipamento</th><th>Descrição</th></tr>
    {{#each service.service_equipments}}
    <tr><td>{{equipment.name}}</td><td>{{or_default equipment.description}}</td></tr>
    {{/each}}
  </table>
  {{else}}<p class="empty">Nenhum equipamento</p>{{/if}}
</section>

<section>
  <h2><span>EPIs</span></h2>
  {{#if service.service_epi}}
  <table>
    <tr><th>EPI</th><th>Quantidade</th><th>Descrição</th></tr>
    {{#each service.service_epi}}
    <tr><td>{{epi_item.name}}</td><td>{{quantity}}</td><td>{{or_default epi_item.description}}</td></tr>
    {{/each}}
  </table>
  {{else}}<p class="empty">Nenhum EPI</p>{{/if}}
</section>

<section>
  <h2><span>Observações</span></h2>
  {{#each service.observations}}
  <div class="observation">
    <small>{{date_br observation_date}}{{#if team_member}} · {{team_member.name}}{{/if}}</small>
    <div>{{description}}</div>
  </div>
  {{else}}<p class="empty">Nenhuma observação</p>
  {{/each}}
</section>
</body>
</html>
"#;

handlebars_helper!(date_br: |v: Value| {
    match v {
        Value::String(text) if !text.trim().is_empty() => parse_order_date(&text)
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or(text),
        _ => NOT_INFORMED.to_string(),
    }
});

handlebars_helper!(or_default: |v: Value| {
    match v {
        Value::Null => NOT_INFORMED.to_string(),
        Value::String(text) if text.trim().is_empty() => NOT_INFORMED.to_string(),
        Value::String(text) => text,
        other => other.to_string(),
    }
});

/// Report page renderer
pub struct ReportPage {
    templates: Handlebars<'static>,
}

impl ReportPage {
    const NAME: &'static str = "order_report";

    pub fn new() -> ReportResult<Self> {
        let mut templates = Handlebars::new();
        templates.register_helper("date_br", Box::new(date_br));
        templates.register_helper("or_default", Box::new(or_default));
        templates
            .register_template_string(Self::NAME, REPORT_TEMPLATE)
            .map_err(|e| ReportError::Template(e.to_string()))?;
        Ok(Self { templates })
    }

    pub fn render(&self, order: &OrderAggregate) -> ReportResult<String> {
        let mut order = order.clone();
        order.arrange();
        let context = json!({
            "service": order,
            "estimated_minutes": order.estimated_minutes(),
        });
        self.templates
            .render(Self::NAME, &context)
            .map_err(|e| ReportError::Template(e.to_string()))
    }
}
