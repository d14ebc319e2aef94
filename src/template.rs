use serde::Serialize;
use tinytemplate::TinyTemplate;

/// Renders a string template using `TinyTemplate`.
///
/// Template variables use the `{name}` syntax. Values are inserted
/// verbatim, without HTML escaping.
///
/// # Examples
///
/// ```
/// use llama_pile::template::render_template;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Ctx { text: &'static str }
///
/// let out = render_template("Hello {text}!", &Ctx { text: "'world'" }).unwrap();
/// assert_eq!(out, "Hello 'world'!");
/// ```
#[inline]
pub fn render_template<T: Serialize>(
    template: &str,
    ctx: &T,
) -> Result<String, tinytemplate::error::Error> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("tpl", template)?;
    tt.render("tpl", ctx)
}

#[cfg(test)]
mod tests {
    use super::render_template;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Ctx<'a> {
        previous_thoughts: &'a str,
    }

    #[test]
    fn multiline_values_are_kept() {
        let out = render_template(
            "Previous: {previous_thoughts}",
            &Ctx {
                previous_thoughts: "curator:\na: b",
            },
        )
        .unwrap();
        assert_eq!(out, "Previous: curator:\na: b");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        assert!(render_template("{missing}", &Ctx { previous_thoughts: "" }).is_err());
    }
}
