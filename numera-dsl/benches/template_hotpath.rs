use criterion::{black_box, criterion_group, criterion_main, Criterion};
use numera_core::{
    EntitySchema, FieldCategory, FieldDescriptor, FieldPolicy, NumeraResult, RecordRef,
    RecordResolver, RecordSnapshot, SchemaProvider, TemplateSlot,
};
use numera_dsl::{parse_template, CodeBuilder, FieldResolver, RenderOptions};
use std::sync::Arc;

const TEMPLATE: &str = "%(**INV-,partner.country.code,**/,year,**/,number[6])";

struct Schemas {
    invoice: Arc<EntitySchema>,
    partner: Arc<EntitySchema>,
    country: Arc<EntitySchema>,
}

impl SchemaProvider for Schemas {
    fn schema(&self, entity: &str) -> Option<Arc<EntitySchema>> {
        match entity {
            "invoice" => Some(Arc::clone(&self.invoice)),
            "partner" => Some(Arc::clone(&self.partner)),
            "country" => Some(Arc::clone(&self.country)),
            _ => None,
        }
    }
}

struct NoRecords;

impl RecordResolver for NoRecords {
    fn resolve(&self, _reference: &RecordRef) -> NumeraResult<Option<RecordSnapshot>> {
        Ok(None)
    }
}

fn schemas() -> Schemas {
    Schemas {
        invoice: Arc::new(
            EntitySchema::new("invoice", "Customer Invoice")
                .with_field(FieldDescriptor::new("year", FieldCategory::Integer))
                .with_field(FieldDescriptor::new("number", FieldCategory::Integer))
                .with_field(FieldDescriptor::relation("partner", "partner")),
        ),
        partner: Arc::new(
            EntitySchema::new("partner", "Contact")
                .with_field(FieldDescriptor::relation("country", "country")),
        ),
        country: Arc::new(
            EntitySchema::new("country", "Country")
                .with_field(FieldDescriptor::new("code", FieldCategory::Text)),
        ),
    }
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("template/parse", |b| {
        b.iter(|| {
            let expr = parse_template(black_box(TEMPLATE)).expect("parse template");
            black_box(expr.tokens.len());
        });
    });
}

fn bench_render(c: &mut Criterion) {
    let schemas = schemas();
    let builder = CodeBuilder::new(FieldResolver::new(&schemas, &NoRecords));
    let expr = parse_template(TEMPLATE).expect("parse template");
    let invoice = Arc::clone(&schemas.invoice);
    let record = RecordSnapshot::new()
        .with("year", 2024)
        .with("number", 42)
        .with(
            "partner",
            RecordSnapshot::new().with("country", RecordSnapshot::new().with("code", "FR")),
        );
    let options = RenderOptions::for_slot(TemplateSlot::Prefix, FieldPolicy::Scalar);

    c.bench_function("template/render_nested", |b| {
        b.iter(|| {
            let outcome = builder
                .render(black_box(&expr), &invoice, black_box(&record), options)
                .expect("render template");
            black_box(outcome);
        });
    });
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
