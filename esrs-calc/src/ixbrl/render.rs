//! XHTML serialization of a resolved document

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::document::{ResolvedDocument, ResolvedFact};
use super::model::{display_number, ContextKey, FactValue, UnitKey};
use super::taxonomy::{LEI_SCHEME, NUMBER_FORMAT, PREFIXES};
use super::ExportError;

pub struct RenderOptions<'a> {
    pub title: &'a str,
    pub lei: &'a str,
    pub entry_point: &'a str,
}

struct Out {
    writer: Writer<Vec<u8>>,
}

impl Out {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ExportError> {
        self.writer
            .write_event(event)
            .map_err(|e| ExportError::Xml(e.to_string()))
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), ExportError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.event(Event::Empty(start))
    }

    fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), ExportError> {
        self.open(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String, ExportError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| ExportError::Xml(e.to_string()))
    }
}

pub fn render(doc: &ResolvedDocument, options: &RenderOptions<'_>) -> Result<String, ExportError> {
    let mut out = Out::new();

    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.open("html", &PREFIXES)?;

    out.open("head", &[])?;
    out.empty(
        "meta",
        &[("http-equiv", "Content-Type"), ("content", "text/html; charset=UTF-8")],
    )?;
    out.leaf("title", &[], options.title)?;
    out.close("head")?;

    out.open("body", &[])?;

    // Declarations precede every fact
    out.open("div", &[("style", "display:none")])?;
    out.open("ix:header", &[])?;
    out.open("ix:references", &[])?;
    out.empty(
        "link:schemaRef",
        &[("xlink:type", "simple"), ("xlink:href", options.entry_point)],
    )?;
    out.close("ix:references")?;
    out.open("ix:resources", &[])?;
    for (id, key) in &doc.contexts {
        write_context(&mut out, id, key, options.lei)?;
    }
    for (id, key) in &doc.units {
        write_unit(&mut out, id, key)?;
    }
    out.close("ix:resources")?;
    out.close("ix:header")?;
    out.close("div")?;

    out.leaf("h1", &[], options.title)?;
    for section in &doc.sections {
        out.leaf("h2", &[], &section.title)?;
        out.open("table", &[])?;
        for fact in &section.facts {
            out.open("tr", &[])?;
            out.leaf("td", &[], &fact.fact.label)?;
            out.open("td", &[])?;
            write_fact(&mut out, fact)?;
            out.close("td")?;
            out.close("tr")?;
        }
        out.close("table")?;
    }

    out.close("body")?;
    out.close("html")?;
    out.finish()
}

fn write_context(out: &mut Out, id: &str, key: &ContextKey, lei: &str) -> Result<(), ExportError> {
    out.open("xbrli:context", &[("id", id)])?;

    out.open("xbrli:entity", &[])?;
    out.leaf("xbrli:identifier", &[("scheme", LEI_SCHEME)], lei)?;
    out.close("xbrli:entity")?;

    out.open("xbrli:period", &[])?;
    out.leaf("xbrli:startDate", &[], &key.period.start.format("%Y-%m-%d").to_string())?;
    out.leaf("xbrli:endDate", &[], &key.period.end.format("%Y-%m-%d").to_string())?;
    out.close("xbrli:period")?;

    if !key.members.is_empty() {
        out.open("xbrli:scenario", &[])?;
        for member in &key.members {
            out.leaf(
                "xbrldi:explicitMember",
                &[("dimension", member.dimension.as_str())],
                &member.member,
            )?;
        }
        out.close("xbrli:scenario")?;
    }

    out.close("xbrli:context")
}

fn write_unit(out: &mut Out, id: &str, key: &UnitKey) -> Result<(), ExportError> {
    out.open("xbrli:unit", &[("id", id)])?;
    match key {
        UnitKey::Measure(measure) => out.leaf("xbrli:measure", &[], measure)?,
        UnitKey::Divide {
            numerator,
            denominator,
        } => {
            out.open("xbrli:divide", &[])?;
            out.open("xbrli:unitNumerator", &[])?;
            out.leaf("xbrli:measure", &[], numerator)?;
            out.close("xbrli:unitNumerator")?;
            out.open("xbrli:unitDenominator", &[])?;
            out.leaf("xbrli:measure", &[], denominator)?;
            out.close("xbrli:unitDenominator")?;
            out.close("xbrli:divide")?;
        }
    }
    out.close("xbrli:unit")
}

fn write_fact(out: &mut Out, resolved: &ResolvedFact) -> Result<(), ExportError> {
    let fact = &resolved.fact;
    match &fact.value {
        FactValue::Numeric {
            value,
            decimals,
            scale,
            ..
        } => {
            let unit_id = resolved.unit_id.as_deref().ok_or_else(|| {
                ExportError::Structure(format!("numeric fact {} has no unit", fact.concept))
            })?;
            // decimals describes the accuracy of the scaled value, not the displayed one
            let decimals_attr = (i32::from(*decimals) - i32::from(*scale)).to_string();
            let scale_attr = scale.to_string();
            let shown = display_number(*value, *decimals, *scale);

            let mut attrs = vec![
                ("name", fact.concept.as_str()),
                ("contextRef", resolved.context_id.as_str()),
                ("unitRef", unit_id),
                ("decimals", decimals_attr.as_str()),
                ("scale", scale_attr.as_str()),
                ("format", NUMBER_FORMAT),
            ];
            if *value < 0.0 {
                attrs.push(("sign", "-"));
            }
            out.leaf("ix:nonFraction", &attrs, &shown)
        }
        FactValue::Text(text) => out.leaf(
            "ix:nonNumeric",
            &[
                ("name", fact.concept.as_str()),
                ("contextRef", resolved.context_id.as_str()),
            ],
            text,
        ),
    }
}
