use std::{borrow::Cow, collections::BTreeMap, fmt};

use askama::{Html, MarkupDisplay};

/// Escapes text for use both inside elements and inside quoted attributes.
pub fn escape<T: fmt::Display>(value: T) -> MarkupDisplay<Html, T> {
    MarkupDisplay::new_unsafe(value, Html)
}

/// Validation messages keyed by form field name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors = Self::default();
        for (field, errors) in errors.field_errors() {
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                field_errors.add(&field.to_string(), message);
            }
        }
        field_errors
    }
}

#[derive(Default)]
pub struct BasicAttributes<'a> {
    id: Cow<'a, str>,
    class: Cow<'a, str>,
}

impl<'a> BasicAttributes<'a> {
    pub fn new(id: Cow<'a, str>, class: Cow<'a, str>) -> Self {
        Self { id, class }
    }

    pub fn class(class: &'a str) -> Self {
        Self {
            id: Cow::default(),
            class: Cow::Borrowed(class),
        }
    }
}

impl<'a> fmt::Display for BasicAttributes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.id.is_empty() {
            write!(f, " id=\"{}\"", escape(&self.id))?;
        }
        if !self.class.is_empty() {
            write!(f, " class=\"{}\"", escape(&self.class))?;
        }
        Ok(())
    }
}

#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub enum InputType {
    #[default]
    Text,
    Password,
    File,
    Hidden,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Password => write!(f, "password"),
            Self::File => write!(f, "file"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

#[derive(Default)]
pub struct InputTag<'a> {
    pub attributes: BasicAttributes<'a>,
    pub name: Cow<'a, str>,
    pub type_: InputType,
    pub value: Option<String>,
    pub accept: Option<Cow<'a, str>>,
    pub required: bool,
}

impl<'a> InputTag<'a> {
    pub fn new(name: &'a str, type_: InputType) -> Self {
        Self {
            attributes: BasicAttributes::new(format!("id_{name}").into(), Cow::default()),
            name: Cow::Borrowed(name),
            type_,
            ..Default::default()
        }
    }

    pub fn hidden(name: &'a str, value: String) -> Self {
        Self {
            name: Cow::Borrowed(name),
            type_: InputType::Hidden,
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(Cow::Borrowed(accept));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

impl<'a> fmt::Display for InputTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<input{} name=\"{}\" type=\"{}\"",
            self.attributes,
            escape(&self.name),
            self.type_
        )?;
        if let Some(value) = &self.value {
            write!(f, " value=\"{}\"", escape(value))?;
        }
        if let Some(accept) = &self.accept {
            write!(f, " accept=\"{}\"", escape(accept))?;
        }
        if self.required {
            write!(f, " required")?;
        }
        write!(f, ">")
    }
}

pub struct TextareaTag<'a> {
    attributes: BasicAttributes<'a>,
    name: Cow<'a, str>,
    value: String,
    rows: u16,
    required: bool,
}

impl<'a> TextareaTag<'a> {
    pub fn new(name: &'a str, value: String, required: bool) -> Self {
        Self {
            attributes: BasicAttributes::new(format!("id_{name}").into(), Cow::default()),
            name: Cow::Borrowed(name),
            value,
            rows: 10,
            required,
        }
    }
}

impl<'a> fmt::Display for TextareaTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<textarea{} name=\"{}\" rows=\"{}\"{}>{}</textarea>",
            self.attributes,
            escape(&self.name),
            self.rows,
            if self.required { " required" } else { "" },
            escape(&self.value)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

pub struct SelectTag<'a> {
    attributes: BasicAttributes<'a>,
    name: Cow<'a, str>,
    options: Vec<SelectOption>,
    selected: Option<String>,
    required: bool,
}

impl<'a> SelectTag<'a> {
    /// Optional selects get a leading blank choice.
    pub fn new(
        name: &'a str,
        options: Vec<SelectOption>,
        selected: Option<String>,
        required: bool,
    ) -> Self {
        let options = if required {
            options
        } else {
            std::iter::once(SelectOption::new("", "---------"))
                .chain(options)
                .collect()
        };
        Self {
            attributes: BasicAttributes::new(format!("id_{name}").into(), Cow::default()),
            name: Cow::Borrowed(name),
            options,
            selected,
            required,
        }
    }
}

impl<'a> fmt::Display for SelectTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<select{} name=\"{}\"{}>",
            self.attributes,
            escape(&self.name),
            if self.required { " required" } else { "" }
        )?;
        for option in &self.options {
            let selected = self.selected.as_deref() == Some(option.value.as_str());
            write!(
                f,
                "<option value=\"{}\"{}>{}</option>",
                escape(&option.value),
                if selected { " selected" } else { "" },
                escape(&option.label)
            )?;
        }
        write!(f, "</select>")
    }
}

#[derive(Default)]
pub enum ChildTag {
    #[default]
    Label,
    P,
    Span,
}

impl fmt::Display for ChildTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label => write!(f, "label"),
            Self::P => write!(f, "p"),
            Self::Span => write!(f, "span"),
        }
    }
}

#[derive(Default)]
pub struct GeneralChildTag<'a> {
    tag: ChildTag,
    attributes: BasicAttributes<'a>,
    for_: Option<Cow<'a, str>>,
    value: Cow<'a, str>,
}

impl<'a> GeneralChildTag<'a> {
    fn new(tag: ChildTag, attributes: BasicAttributes<'a>, value: Cow<'a, str>) -> Self {
        Self {
            tag,
            attributes,
            for_: None,
            value,
        }
    }

    pub fn label(for_name: &str, value: Cow<'a, str>) -> Self {
        Self {
            tag: ChildTag::Label,
            attributes: BasicAttributes::default(),
            for_: Some(format!("id_{for_name}").into()),
            value,
        }
    }

    pub fn error(message: String) -> Self {
        Self::new(
            ChildTag::Span,
            BasicAttributes::class("field-error"),
            message.into(),
        )
    }
}

impl<'a> fmt::Display for GeneralChildTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}{}", self.tag, self.attributes)?;
        if let Some(for_) = &self.for_ {
            write!(f, " for=\"{}\"", escape(for_))?;
        }
        write!(f, ">{}</{}>", escape(&self.value), self.tag)
    }
}

pub enum ParentTag {
    Button,
    Div,
}

impl fmt::Display for ParentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button => write!(f, "button"),
            Self::Div => write!(f, "div"),
        }
    }
}

pub struct GeneralParentTag<'a> {
    tag: ParentTag,
    attributes: BasicAttributes<'a>,
    children: Vec<HtmlTag<'a>>,
    type_: Option<Cow<'a, str>>,
}

impl<'a> GeneralParentTag<'a> {
    fn new(
        tag: ParentTag,
        attributes: BasicAttributes<'a>,
        children: Vec<HtmlTag<'a>>,
    ) -> Self {
        Self {
            tag,
            attributes,
            children,
            type_: None,
        }
    }

    pub fn submit_button(value: &'a str) -> Self {
        let child = GeneralChildTag {
            tag: ChildTag::Span,
            value: Cow::Borrowed(value),
            ..Default::default()
        };
        Self {
            tag: ParentTag::Button,
            attributes: BasicAttributes::class("btn btn-primary"),
            children: vec![HtmlTag::ChildTag(child)],
            type_: Some(Cow::Borrowed("submit")),
        }
    }

    /// A labelled form row: label, control and the control's errors.
    pub fn field(
        name: &'a str,
        label: &'a str,
        control: HtmlTag<'a>,
        errors: &FieldErrors,
    ) -> Self {
        let mut children = vec![
            HtmlTag::ChildTag(GeneralChildTag::label(name, Cow::Borrowed(label))),
            control,
        ];
        children.extend(
            errors
                .get(name)
                .iter()
                .map(|e| HtmlTag::ChildTag(GeneralChildTag::error(e.clone()))),
        );
        Self::new(ParentTag::Div, BasicAttributes::class("form-group"), children)
    }
}

impl<'a> fmt::Display for GeneralParentTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}{}", self.tag, self.attributes)?;
        if let Some(type_) = &self.type_ {
            write!(f, " type=\"{}\"", escape(type_))?;
        }
        write!(f, ">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

pub struct FormTag<'a> {
    action: Cow<'a, str>,
    method: Cow<'a, str>,
    enctype: Option<Cow<'a, str>>,
    attributes: BasicAttributes<'a>,
    children: Vec<HtmlTag<'a>>,
}

impl<'a> FormTag<'a> {
    pub fn new(action: Cow<'a, str>, children: Vec<HtmlTag<'a>>) -> Self {
        Self {
            action,
            method: Cow::Borrowed("POST"),
            enctype: None,
            attributes: BasicAttributes::class("form"),
            children,
        }
    }

    pub fn multipart(mut self) -> Self {
        self.enctype = Some(Cow::Borrowed("multipart/form-data"));
        self
    }

    pub fn add_child(mut self, child: HtmlTag<'a>) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_csrf(mut self, csrf_token: String) -> Self {
        self.children
            .insert(0, HtmlTag::Input(InputTag::hidden("csrf_token", csrf_token)));
        self
    }
}

impl<'a> fmt::Display for FormTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<form{} method=\"{}\" action=\"{}\"",
            self.attributes,
            escape(&self.method),
            escape(&self.action)
        )?;
        if let Some(enctype) = &self.enctype {
            write!(f, " enctype=\"{}\"", escape(enctype))?;
        }
        write!(f, ">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</form>")
    }
}

pub enum HtmlTag<'a> {
    Form(FormTag<'a>),
    ParentTag(GeneralParentTag<'a>),
    Input(InputTag<'a>),
    Textarea(TextareaTag<'a>),
    Select(SelectTag<'a>),
    ChildTag(GeneralChildTag<'a>),
}

impl<'a> fmt::Display for HtmlTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form(tag) => write!(f, "{}", tag),
            Self::ParentTag(tag) => write!(f, "{}", tag),
            Self::Input(tag) => write!(f, "{}", tag),
            Self::Textarea(tag) => write!(f, "{}", tag),
            Self::Select(tag) => write!(f, "{}", tag),
            Self::ChildTag(tag) => write!(f, "{}", tag),
        }
    }
}

pub trait ToForm {
    fn form_button<'a>() -> HtmlTag<'a> {
        HtmlTag::ParentTag(GeneralParentTag::submit_button("Save"))
    }

    fn raw_form<'a>(&'a self, action: Cow<'a, str>, errors: &FieldErrors) -> FormTag<'a>;

    fn to_form<'a>(
        &'a self,
        action: Cow<'a, str>,
        errors: &FieldErrors,
        csrf_token: String,
    ) -> HtmlTag<'a> {
        let form = self
            .raw_form(action, errors)
            .with_csrf(csrf_token)
            .add_child(Self::form_button());
        HtmlTag::Form(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_form_tag() {
        let result = HtmlTag::Form(FormTag::new("/create/".into(), vec![]));
        assert_eq!(
            &result.to_string(),
            "<form class=\"form\" method=\"POST\" action=\"/create/\"></form>"
        );
    }

    #[test]
    fn test_form_with_csrf_and_multipart() {
        let result = HtmlTag::Form(
            FormTag::new("/create/".into(), vec![])
                .multipart()
                .with_csrf("token".into()),
        );
        assert_eq!(
            &result.to_string(),
            "<form class=\"form\" method=\"POST\" action=\"/create/\" enctype=\"multipart/form-data\"><input name=\"csrf_token\" type=\"hidden\" value=\"token\"></form>"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let area = TextareaTag::new("text", "<script>alert('x')</script>".into(), true);
        assert_eq!(
            area.to_string(),
            "<textarea id=\"id_text\" name=\"text\" rows=\"10\" required>&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;</textarea>"
        );
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let input = InputTag::new("username", InputType::Text)
            .with_value(Some("\"><b>&".into()));
        assert_eq!(
            input.to_string(),
            "<input id=\"id_username\" name=\"username\" type=\"text\" value=\"&quot;&gt;&lt;b&gt;&amp;\">"
        );
    }

    #[test]
    fn test_optional_select_has_blank_choice_and_selection() {
        let select = SelectTag::new(
            "group",
            vec![SelectOption::new("1", "Rust"), SelectOption::new("2", "Go")],
            Some("2".into()),
            false,
        );
        assert_eq!(
            select.to_string(),
            "<select id=\"id_group\" name=\"group\"><option value=\"\">---------</option><option value=\"1\">Rust</option><option value=\"2\" selected>Go</option></select>"
        );
    }

    #[test]
    fn test_field_renders_errors() {
        let mut errors = FieldErrors::default();
        errors.add("text", "This field is required.");
        let field = GeneralParentTag::field(
            "text",
            "Text",
            HtmlTag::Textarea(TextareaTag::new("text", String::new(), true)),
            &errors,
        );
        assert_eq!(
            field.to_string(),
            "<div class=\"form-group\"><label for=\"id_text\">Text</label><textarea id=\"id_text\" name=\"text\" rows=\"10\" required></textarea><span class=\"field-error\">This field is required.</span></div>"
        );
    }
}
