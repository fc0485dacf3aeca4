//! API views: route registrations on routers, decorators and Hapi servers.

use crate::entity::{ArgumentInfo, CallLikeEntity, ClassEntity, Entity};
use crate::model::ObjectValue;
use crate::vocab::{is_route_like, join_route};

use super::ViewContext;

/// Verbs recognised on ServerJS routers, which are called unqualified.
const SERVERJS_METHODS: &[&str] = &["get", "head", "post", "put", "del"];
const SFRA_METHODS: &[&str] = &["get", "post"];

/// Normalized accessors shared by API views.
pub trait Api {
    fn call(&self) -> &CallLikeEntity;
    /// Upper-case HTTP method, when one can be read off the call.
    fn suspected_method(&self) -> Option<String>;
    fn suspected_route(&self) -> Option<String>;
    fn first_arg_string(&self) -> Option<&str>;
    fn argument_types(&self) -> &[ArgumentInfo];
}

/// Any call with arguments, read as a possible route registration.
#[derive(Debug)]
pub struct CallExpressionView<'a> {
    call: &'a CallLikeEntity,
    cx: ViewContext<'a>,
}

impl<'a> CallExpressionView<'a> {
    pub fn accepts(entity: &Entity, cx: ViewContext<'_>) -> bool {
        entity.as_call().is_some_and(|call| {
            let full_name = call.full_name();
            !full_name.starts_with("console.")
                && (!call.arguments.is_empty() || cx.vocab.is_http_method_ignore_case(&full_name))
        })
    }

    pub fn new(call: &'a CallLikeEntity, cx: ViewContext<'a>) -> Self {
        Self { call, cx }
    }

    pub fn call(&self) -> &'a CallLikeEntity {
        self.call
    }

    /// The class the call is written in.
    pub fn class_entity(&self) -> Option<&'a ClassEntity> {
        self.cx.class_of(self.call.class_key.as_ref())
    }

    /// `server.get('Show', ...)` in a module importing `server`.
    pub fn is_sfra_route(&self) -> bool {
        let call = self.call;
        self.cx.module.has_import("server")
            && call.is_property_access
            && SFRA_METHODS.contains(&call.func_name().as_str())
            && call.has_minimum_arguments(2)
    }

    /// `get('/path', handler)` imported from `server` or `server/router`.
    pub fn is_serverjs_route(&self) -> bool {
        let call = self.call;
        (self.cx.module.has_import("server") || self.cx.module.has_import("server/router"))
            && SERVERJS_METHODS.contains(&call.full_name().as_str())
            && call.has_minimum_arguments(2)
    }

    fn decorator_route(&self) -> Option<String> {
        let first = self.call.first_arg_string();
        match self.class_entity().and_then(ClassEntity::controller_prefix) {
            Some(prefix) => Some(join_route([prefix, first.unwrap_or_default()])),
            None => first.filter(|s| is_route_like(s)).map(str::to_string),
        }
    }
}

impl Api for CallExpressionView<'_> {
    fn call(&self) -> &CallLikeEntity {
        self.call
    }

    fn suspected_method(&self) -> Option<String> {
        let func_name = self.call.func_name();
        let matches = if self.call.is_decorator {
            self.cx.vocab.is_http_method_ignore_case(&func_name)
        } else {
            self.cx.vocab.is_http_method(&func_name)
        };
        if matches {
            Some(func_name.to_uppercase())
        } else if func_name == "del" {
            Some("DELETE".to_string())
        } else {
            None
        }
    }

    fn suspected_route(&self) -> Option<String> {
        let first = self.call.first_arg_string();
        if self.call.is_decorator {
            return self.decorator_route();
        }
        if self.is_sfra_route() {
            if let Some(name) = first {
                return Some(format!("/{}-{}", self.cx.module.file_stem(), name));
            }
        }
        if let Some(root) = self.call.root_route_path.as_deref() {
            return Some(join_route([root, first.unwrap_or_default()]));
        }
        if let Some(route) = first.filter(|s| is_route_like(s)) {
            return Some(route.to_string());
        }
        if self.is_serverjs_route() {
            return Some("/".to_string());
        }
        None
    }

    fn first_arg_string(&self) -> Option<&str> {
        self.call.first_arg_string()
    }

    fn argument_types(&self) -> &[ArgumentInfo] {
        &self.call.arguments
    }
}

fn is_route_object(value: &ObjectValue) -> bool {
    value.get("path").is_some() && value.get("method").is_some()
}

/// The first route configuration object of `server.route(...)`.
fn route_object(call: &CallLikeEntity) -> Option<&ObjectValue> {
    match call.arguments.first()?.shape.as_ref()? {
        value @ ObjectValue::Object(_) => Some(value).filter(|v| is_route_object(v)),
        ObjectValue::List(items) => {
            if items.is_empty() || !items.iter().all(is_route_object) {
                return None;
            }
            items.first()
        }
        _ => None,
    }
}

/// `server.route({method, path, handler})` in a Hapi module.
#[derive(Debug)]
pub struct HapiView<'a> {
    call: &'a CallLikeEntity,
    route: &'a ObjectValue,
}

impl<'a> HapiView<'a> {
    pub fn accepts(entity: &Entity, cx: ViewContext<'_>) -> bool {
        entity.as_call().is_some_and(|call| {
            (cx.module.has_import("@hapi/hapi") || cx.module.has_import("hapi"))
                && call.method_name.as_deref() == Some("route")
                && route_object(call).is_some()
        })
    }

    pub fn new(call: &'a CallLikeEntity, _cx: ViewContext<'a>) -> Option<Self> {
        Some(Self {
            call,
            route: route_object(call)?,
        })
    }

    pub fn call(&self) -> &'a CallLikeEntity {
        self.call
    }
}

impl Api for HapiView<'_> {
    fn call(&self) -> &CallLikeEntity {
        self.call
    }

    fn suspected_method(&self) -> Option<String> {
        let method = self.route.get("method")?;
        let text = match method {
            ObjectValue::List(items) => items.first().and_then(ObjectValue::as_leaf),
            other => other.as_leaf(),
        }?;
        Some(text.to_uppercase())
    }

    fn suspected_route(&self) -> Option<String> {
        self.route.get("path")?.as_leaf().map(str::to_string)
    }

    fn first_arg_string(&self) -> Option<&str> {
        self.call.first_arg_string()
    }

    fn argument_types(&self) -> &[ArgumentInfo] {
        &self.call.arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{build, resolve, ResolvedModule};
    use crate::model::{
        Argument, CallConstruct, Callability, ClassConstruct, Construct, Decorator, Import,
        ParsedModule, Span, SyntaxKind,
    };
    use crate::views::{select, EntityView, ViewGroup, ViewKind};
    use crate::vocab::Vocabulary;

    fn string_arg(value: &str) -> Argument {
        Argument {
            syntax: SyntaxKind::StringLiteral,
            type_name: "string-literal".into(),
            literal: Some(value.into()),
            callability: Callability::NonCallable,
            ..Default::default()
        }
    }

    fn handler() -> Argument {
        Argument {
            syntax: SyntaxKind::ArrowFunction,
            type_name: "lambda".into(),
            callability: Callability::Callable,
            arities: vec![2],
            ..Default::default()
        }
    }

    fn call(span: Span, target: &str, arguments: Vec<Argument>) -> CallConstruct {
        let (owner, method) = match target.rsplit_once('.') {
            Some((o, m)) => (Some(o.to_string()), Some(m.to_string())),
            None => (None, None),
        };
        CallConstruct {
            span,
            target: target.into(),
            target_type: "lambda".into(),
            is_property_access: owner.is_some(),
            owner_text: owner,
            method_name: method,
            arguments,
            ..Default::default()
        }
    }

    fn resolved(path: &str, imports: &[&str], constructs: Vec<Construct>) -> ResolvedModule {
        let mut module = ParsedModule::new(path);
        module.imports = imports.iter().map(|i| Import::new(*i)).collect();
        module.constructs = constructs;
        resolve(build(module), &Vocabulary::default())
    }

    #[test]
    fn test_console_and_empty_calls_rejected() {
        let module = resolved(
            "a.ts",
            &[],
            vec![
                Construct::Call(call(
                    Span::new((0, 0), (0, 20)),
                    "console.log",
                    vec![string_arg("x")],
                )),
                Construct::Call(call(Span::new((1, 0), (1, 10)), "init", vec![])),
                Construct::Call(call(Span::new((2, 0), (2, 10)), "get", vec![])),
            ],
        );
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let accepted: Vec<bool> = module
            .entities()
            .iter()
            .map(|e| CallExpressionView::accepts(e, cx))
            .collect();
        assert_eq!(accepted, vec![false, false, true]);
    }

    #[test]
    fn test_express_route() {
        let module = resolved(
            "app.ts",
            &["express"],
            vec![Construct::Call(call(
                Span::new((3, 0), (5, 2)),
                "app.post",
                vec![string_arg("/users"), handler()],
            ))],
        );
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let view = CallExpressionView::new(module.entities()[0].as_call().unwrap(), cx);
        assert_eq!(view.suspected_method().as_deref(), Some("POST"));
        assert_eq!(view.suspected_route().as_deref(), Some("/users"));
        assert_eq!(view.first_arg_string(), Some("/users"));
    }

    #[test]
    fn test_nestjs_decorator_routes() {
        let class_span = Span::new((10, 0), (30, 1));
        let mut get = call(Span::new((12, 2), (12, 8)), "Get", vec![]);
        get.is_decorator = true;
        get.enclosing_class = Some(class_span);
        let mut post = call(Span::new((18, 2), (18, 17)), "Post", vec![string_arg("yellow")]);
        post.is_decorator = true;
        post.enclosing_class = Some(class_span);
        let module = resolved(
            "nestjs.ts",
            &["@nestjs/common"],
            vec![
                Construct::Class(ClassConstruct {
                    span: class_span,
                    name: Some("BlueController".into()),
                    decorators: vec![Decorator {
                        name: "Controller".into(),
                        arguments: vec![string_arg("blue")],
                    }],
                    ..Default::default()
                }),
                Construct::Call(get),
                Construct::Call(post),
            ],
        );
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let routes: Vec<_> = module.entities()[1..]
            .iter()
            .map(|e| CallExpressionView::new(e.as_call().unwrap(), cx))
            .map(|v| (v.suspected_method(), v.suspected_route()))
            .collect();
        assert_eq!(
            routes,
            vec![
                (Some("GET".to_string()), Some("/blue".to_string())),
                (Some("POST".to_string()), Some("/blue/yellow".to_string())),
            ]
        );
    }

    #[test]
    fn test_sfra_route_uses_file_stem() {
        let module = resolved(
            "cartridge/controllers/sfra.js",
            &["server"],
            vec![Construct::Call(call(
                Span::new((3, 0), (6, 2)),
                "server.get",
                vec![string_arg("Show"), handler(), handler()],
            ))],
        );
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let view = CallExpressionView::new(module.entities()[0].as_call().unwrap(), cx);
        assert!(view.is_sfra_route());
        assert_eq!(view.suspected_route().as_deref(), Some("/sfra-Show"));
    }

    #[test]
    fn test_hapi_route_object() {
        let route = Argument {
            syntax: SyntaxKind::ObjectLiteralExpression,
            type_name: "object".into(),
            shape: Some(
                serde_json::from_str(
                    r#"{"method": "GET", "path": "/getgetget", "handler": "handler"}"#,
                )
                .unwrap(),
            ),
            ..Default::default()
        };
        let module = resolved(
            "hapi.ts",
            &["@hapi/hapi"],
            vec![Construct::Call(call(Span::new((2, 0), (8, 2)), "server.route", vec![route]))],
        );
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let selection = select(&module.entities()[0], cx, &[ViewGroup::Api]);
        let kinds: Vec<_> = selection.views.iter().map(EntityView::kind).collect();
        assert_eq!(kinds, vec![ViewKind::Hapi]);
        let api = selection.views[0].as_api().unwrap();
        assert_eq!(api.suspected_method().as_deref(), Some("GET"));
        assert_eq!(api.suspected_route().as_deref(), Some("/getgetget"));
    }
}
