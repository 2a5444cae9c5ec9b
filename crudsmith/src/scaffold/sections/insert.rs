//! Insert form section

use super::{
    action_is, field_row, link_button, note_row, require, SELF_URL, TABLE_CLOSE, TABLE_OPEN,
};
use crate::scaffold::ast::{Expr, Node};
use crate::scaffold::context::GenerationContext;
use crate::scaffold::control::{synthesize, FormMode};
use crate::scaffold::field_type::FieldSet;

/// Build the insert form, shown for `user_action=insert`
#[must_use]
pub fn build(ctx: &GenerationContext) -> Vec<Node> {
    let mut body = vec![
        require(ctx, "insert"),
        Node::markup("<form name=\"insertform\" id=\"insertform\" action=\"\" method=\"post\">\n"),
        Node::markup(TABLE_OPEN),
        Node::field_loop(FieldSet::Insert, |field, _| {
            field_row(field, synthesize(field, FormMode::Insert, None).nodes())
        }),
        note_row(ctx),
        Node::markup(TABLE_CLOSE),
        Node::markup(TABLE_OPEN),
        Node::markup("<tr>\n<td></td>\n<td>\n"),
        Node::markup(
            "<input type=\"submit\" class=\"btn btn-success\" name=\"button_save\" id=\"button_save\" value=\"Save\">\n",
        ),
    ];
    body.extend(link_button("btn-primary", "Cancel", Expr::var(SELF_URL)));
    body.push(Node::markup("</td>\n</tr>\n"));
    body.push(Node::markup(TABLE_CLOSE));
    body.push(Node::markup("</form>\n"));

    vec![Node::when_runtime(action_is("insert"), body)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::ast::Renderer;
    use crate::scaffold::field_type::{DataType, ElementType, FieldDescriptor};
    use crate::scaffold::options::GenerationOptions;
    use crate::scaffold::target::{Jsp, Php};

    fn ctx(options: GenerationOptions) -> GenerationContext {
        let fields = vec![
            FieldDescriptor::new("article_id", DataType::Int).primary_key().list(),
            FieldDescriptor::new("title", DataType::Text).required().insert(),
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .insert(),
        ];
        GenerationContext::new("article", &fields, options)
    }

    #[test]
    fn test_insert_form_php() {
        let ctx = ctx(GenerationOptions::default());
        let out = Renderer::new(&Php, &ctx).render(&build(&ctx));
        assert!(out.starts_with("<?php\nif ($userAction == 'insert') {\n"));
        assert!(out.contains("<tr>\n<td>Title</td>\n<td><input type=\"text\" class=\"form-control\" name=\"title\" id=\"title\" required=\"required\" autocomplete=\"off\">\n</td>\n</tr>\n"));
        assert!(out.contains("<?php echo $cms->createDropDownMenu('category', 'category_id', 'name', null); ?>"));
        assert!(out.contains("name=\"button_save\""));
        assert!(!out.contains("name=\"article_id\""));
        assert!(!out.contains("apv_note"));
        assert!(out.ends_with("</form>\n<?php\n}\n?>\n"));
    }

    #[test]
    fn test_insert_form_takes_note_when_enabled() {
        let ctx = ctx(GenerationOptions::default().with_approval().with_note());
        let out = Renderer::new(&Php, &ctx).render(&build(&ctx));
        assert!(out.contains("<tr>\n<td>Note</td>\n<td><textarea id=\"apv_note\" name=\"apv_note\" class=\"form-control\"></textarea></td>\n</tr>\n</tbody>\n</table>\n"));

        let unmoderated = self::ctx(GenerationOptions::default().with_note());
        assert!(!Renderer::new(&Php, &unmoderated)
            .render(&build(&unmoderated))
            .contains("apv_note"));
    }

    #[test]
    fn test_insert_form_jsp() {
        let ctx = ctx(GenerationOptions::default());
        let out = Renderer::new(&Jsp, &ctx).render(&build(&ctx));
        assert!(out.starts_with("<%\nif (String.valueOf(userAction).equals(String.valueOf(\"insert\"))) {\n"));
        assert!(out.contains("onclick=\"window.location='<%= selfUrl %>';\""));
        assert!(out.contains("<%= cms.createDropDownMenu(\"category\", \"category_id\", \"name\", null) %>"));
    }
}
