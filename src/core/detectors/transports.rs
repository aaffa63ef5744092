//! Transport detection: HTTP route registrations and decorators, gRPC
//! services, GraphQL operations, WebSocket handlers, queue consumers and
//! in-process event listeners.

use regex::{Captures, Regex};

use super::text::{
    header_after, normalize_types, payload_types, signature_from, split_signature,
    DeclarationFinder, FileText,
};
use super::{group, Candidate, ComponentDetector, DETECTION_KEY};
use crate::core::language::Language;
use crate::core::schema::{is_identifier, ComponentKind, TransportProtocol};
use crate::error::Result;

use Language::*;

const JS: &[Language] = &[TypeScript, JavaScript];
const JVM: &[Language] = &[Java, Kotlin];

/// Where a route's path prefix comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    None,
    NestController,
    SpringMapping,
    AspNetRoute,
}

/// How a route is attached to its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// `router.get(path, handler)`: the handler is an argument or inline
    Registration,
    /// `@Get(path)` above the handler function
    Decorator,
    /// `get '/p' do ... end`: the body is the handler
    Block,
}

/// HTTP route rule. Patterns use the named groups `method`, `path` and
/// `args` (the rest of the registration call).
struct HttpRule {
    name: &'static str,
    languages: &'static [Language],
    pattern: Regex,
    style: Style,
    fixed_method: Option<&'static str>,
    prefix: Prefix,
}

impl HttpRule {
    fn new(
        name: &'static str,
        languages: &'static [Language],
        style: Style,
        pattern: &str,
    ) -> Result<Self> {
        Ok(Self {
            name,
            languages,
            pattern: Regex::new(pattern)?,
            style,
            fixed_method: None,
            prefix: Prefix::None,
        })
    }

    fn method(mut self, method: &'static str) -> Self {
        self.fixed_method = Some(method);
        self
    }

    fn prefixed(mut self, prefix: Prefix) -> Self {
        self.prefix = prefix;
        self
    }
}

/// Named-key rule for socket, queue and event handlers; the `key` group
/// becomes `{tag}{key}`.
struct KeyedRule {
    name: &'static str,
    languages: &'static [Language],
    pattern: Regex,
    protocol: TransportProtocol,
    tag: &'static str,
    broker: Option<&'static str>,
}

impl KeyedRule {
    fn new(
        name: &'static str,
        languages: &'static [Language],
        protocol: TransportProtocol,
        tag: &'static str,
        pattern: &str,
    ) -> Result<Self> {
        Ok(Self {
            name,
            languages,
            pattern: Regex::new(pattern)?,
            protocol,
            tag,
            broker: None,
        })
    }

    fn broker(mut self, broker: &'static str) -> Self {
        self.broker = Some(broker);
        self
    }
}

pub struct TransportDetector {
    http: Vec<HttpRule>,
    keyed: Vec<KeyedRule>,
    nest_controller: Regex,
    spring_mapping: Regex,
    aspnet_route: Regex,
    flask_methods: Regex,
    response_model: Regex,
    grpc_service: Regex,
    grpc_rpc: Regex,
    sdl_root: Regex,
    sdl_field: Regex,
    code_first_operation: Regex,
    method_name: Regex,
    declarations: DeclarationFinder,
    max_lines: usize,
}

impl TransportDetector {
    pub fn new(max_lines: usize) -> Result<Self> {
        let http = vec![
            HttpRule::new(
                "express",
                JS,
                Style::Registration,
                r#"(?m)\b(?:router|app|server|api|routes)\.(?P<method>get|post|put|patch|delete|head|options|all)\s*\(\s*['"`](?P<path>[^'"`]*)['"`](?P<args>[^\n]*)"#,
            )?,
            HttpRule::new(
                "gin",
                &[Go],
                Style::Registration,
                r#"(?m)\b\w+\.(?P<method>GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|Any)\s*\(\s*"(?P<path>[^"]*)"(?P<args>[^\n]*)"#,
            )?,
            HttpRule::new(
                "net_http",
                &[Go],
                Style::Registration,
                r#"(?m)\b\w+\.(?:HandleFunc|Handle)\s*\(\s*"(?P<path>[^"]*)"(?P<args>[^\n]*)"#,
            )?
            .method("ANY"),
            HttpRule::new(
                "nestjs",
                JS,
                Style::Decorator,
                r#"(?m)^[ \t]*@(?P<method>Get|Post|Put|Patch|Delete|Head|Options|All)\s*\(\s*(?:['"`](?P<path>[^'"`]*)['"`])?\s*\)"#,
            )?
            .prefixed(Prefix::NestController),
            HttpRule::new(
                "spring",
                JVM,
                Style::Decorator,
                r#"(?m)^[ \t]*@(?P<method>Get|Post|Put|Patch|Delete)Mapping\b(?:\s*\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*"(?P<path>[^"]*)")?"#,
            )?
            .prefixed(Prefix::SpringMapping),
            HttpRule::new(
                "fastapi",
                &[Python],
                Style::Decorator,
                r#"(?m)^[ \t]*@\w+\.(?P<method>get|post|put|patch|delete|head|options)\s*\(\s*['"](?P<path>[^'"]*)['"](?P<args>[^\n]*)"#,
            )?,
            HttpRule::new(
                "flask",
                &[Python],
                Style::Decorator,
                r#"(?m)^[ \t]*@\w+\.route\s*\(\s*['"](?P<path>[^'"]*)['"](?P<args>[^\n]*)"#,
            )?,
            HttpRule::new(
                "axum",
                &[Rust],
                Style::Registration,
                r#"(?m)\.route\s*\(\s*"(?P<path>[^"]*)"\s*,\s*(?P<method>get|post|put|patch|delete|head|options|any)\s*\((?P<args>[^\n]*)"#,
            )?,
            HttpRule::new(
                "actix",
                &[Rust],
                Style::Decorator,
                r#"(?m)^[ \t]*#\[(?P<method>get|post|put|patch|delete|head)\s*\(\s*"(?P<path>[^"]*)""#,
            )?,
            HttpRule::new(
                "aspnet",
                &[CSharp],
                Style::Decorator,
                r#"(?m)^[ \t]*\[Http(?P<method>Get|Post|Put|Patch|Delete|Head)(?:\s*\(\s*"(?P<path>[^"]*)"\s*\))?\]"#,
            )?
            .prefixed(Prefix::AspNetRoute),
            HttpRule::new(
                "rails",
                &[Ruby],
                Style::Block,
                r#"(?m)^[ \t]*(?P<method>get|post|put|patch|delete)\s+['"](?P<path>[^'"]*)['"](?P<args>[^\n]*)"#,
            )?,
        ];

        use TransportProtocol::{Mq, Unknown, Websocket};
        let keyed = vec![
            KeyedRule::new(
                "socket_on",
                JS,
                Websocket,
                "ws:",
                r#"\b(?:socket|ws|io|wss|WebSocket)\.on\s*\(\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?,
            KeyedRule::new(
                "subscribe_message",
                JS,
                Websocket,
                "ws:",
                r#"@SubscribeMessage\s*\(\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?,
            KeyedRule::new(
                "websocket_gateway",
                JS,
                Websocket,
                "ws:",
                r"(?m)@WebSocketGateway\b[^\n]*\n(?:[ \t]*@[^\n]*\n)*[ \t]*(?:export\s+)?class\s+(?P<key>\w+)",
            )?,
            KeyedRule::new(
                "socketio",
                &[Python],
                Websocket,
                "ws:",
                r#"@socketio\.on\s*\(\s*['"](?P<key>[^'"]+)['"]"#,
            )?,
            KeyedRule::new(
                "kafka_listener",
                JVM,
                Mq,
                "mq:",
                r#"@KafkaListener\s*\([^)]*?topics\s*=\s*\{?\s*"(?P<key>[^"]+)""#,
            )?
            .broker("kafka"),
            KeyedRule::new(
                "rabbit_listener",
                JVM,
                Mq,
                "mq:",
                r#"@RabbitListener\s*\([^)]*?queues\s*=\s*\{?\s*"(?P<key>[^"]+)""#,
            )?
            .broker("rabbitmq"),
            KeyedRule::new(
                "sqs_listener",
                JVM,
                Mq,
                "mq:",
                r#"@SqsListener\s*\(\s*(?:value\s*=\s*)?\{?\s*"(?P<key>[^"]+)""#,
            )?
            .broker("sqs"),
            KeyedRule::new(
                "message_pattern",
                JS,
                Mq,
                "mq:",
                r#"@(?:EventPattern|MessagePattern)\s*\(\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?,
            KeyedRule::new(
                "channel_consume",
                JS,
                Mq,
                "mq:",
                r#"\bchannel\.consume\s*\(\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?
            .broker("amqp"),
            KeyedRule::new(
                "basic_consume",
                &[Python],
                Mq,
                "mq:",
                r#"\bbasic_consume\s*\(\s*(?:queue\s*=\s*)?['"](?P<key>[^'"]+)['"]"#,
            )?
            .broker("amqp"),
            KeyedRule::new(
                "consumer_subscribe",
                JS,
                Mq,
                "mq:",
                r#"\bconsumer\.subscribe\s*\(\s*\{\s*topics?\s*:\s*\[?\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?
            .broker("kafka"),
            KeyedRule::new(
                "on_event",
                JS,
                Unknown,
                "event:",
                r#"@OnEvent\s*\(\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?,
            KeyedRule::new(
                "event_listener",
                JS,
                Unknown,
                "event:",
                r#"\b(?:eventBus|emitter|events)\.on\s*\(\s*['"`](?P<key>[^'"`]+)['"`]"#,
            )?,
        ];

        Ok(Self {
            http,
            keyed,
            nest_controller: Regex::new(
                r#"@Controller\s*\(\s*(?:\{[^}]*?path\s*:\s*)?['"`](?P<prefix>[^'"`]*)['"`]"#,
            )?,
            spring_mapping: Regex::new(
                r#"@RequestMapping\s*\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*"(?P<prefix>[^"]*)""#,
            )?,
            aspnet_route: Regex::new(r#"\[Route\s*\(\s*"(?P<prefix>[^"]*)"\s*\)\]"#)?,
            flask_methods: Regex::new(r#"methods\s*=\s*[\[(]\s*['"](?P<method>\w+)['"]"#)?,
            response_model: Regex::new(r"response_model\s*=\s*(?P<type>[\w\[\]., |]+)")?,
            grpc_service: Regex::new(r"(?m)^[ \t]*service\s+(?P<name>\w+)\s*\{")?,
            grpc_rpc: Regex::new(
                r"rpc\s+(?P<name>\w+)\s*\(\s*(?:stream\s+)?(?P<request>[\w.]+)\s*\)\s*returns\s*\(\s*(?:stream\s+)?(?P<response>[\w.]+)\s*\)",
            )?,
            sdl_root: Regex::new(
                r"(?m)^[ \t]*(?:extend\s+)?type\s+(?P<root>Query|Mutation|Subscription)\s*\{",
            )?,
            sdl_field: Regex::new(
                r"^\s*(?P<field>\w+)\s*(?:\((?P<args>[^)]*)\))?\s*:\s*(?P<returns>[^#\n]+)",
            )?,
            code_first_operation: Regex::new(
                r"(?m)^[ \t]*@(?P<root>Query|Mutation|Subscription)\s*\(",
            )?,
            method_name: Regex::new(
                r"^\s*(?:(?:public|private|protected|static|async)\s+)*(?:[\w<>\[\],.?]+\s+)?(?P<name>\w+)\s*\(",
            )?,
            declarations: DeclarationFinder::new()?,
            max_lines,
        })
    }

    fn prefix_for(&self, prefix: Prefix, content: &str) -> Option<String> {
        let regex = match prefix {
            Prefix::None => return None,
            Prefix::NestController => &self.nest_controller,
            Prefix::SpringMapping => &self.spring_mapping,
            Prefix::AspNetRoute => &self.aspnet_route,
        };
        regex
            .captures(content)
            .and_then(|c| group(&c, 1).map(str::to_string))
    }

    fn detect_http(&self, file: &FileText, out: &mut Vec<Candidate>) {
        for rule in self.http.iter().filter(|r| r.languages.contains(&file.language)) {
            let prefix = self.prefix_for(rule.prefix, file.content);

            for captures in rule.pattern.captures_iter(file.content) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                let line = file.line_index(whole.start());
                let args = captures.name("args").map(|m| m.as_str()).unwrap_or("");
                let raw_path = captures.name("path").map(|m| m.as_str()).unwrap_or("");

                let (method, raw_path) = self.resolve_method(rule, &captures, raw_path, args);
                let path = join_path(prefix.as_deref().unwrap_or(""), raw_path);

                let mut candidate =
                    Candidate::new(ComponentKind::Transport, format!("{} {}", method, path), file, line)
                        .with_meta(DETECTION_KEY, rule.name)
                        .with_end(file.block_end(line, self.max_lines));
                candidate.transport_protocol = Some(TransportProtocol::Http);
                candidate.http_method = Some(method);
                candidate.http_path = Some(path);

                let signature = match rule.style {
                    Style::Decorator => Some(signature_from(
                        &file.lines,
                        header_after(&file.lines, line + 1),
                    )),
                    Style::Block => None,
                    Style::Registration => match handler_argument(args) {
                        Some(handler) => {
                            let declared = self.declarations.find(file, &handler);
                            candidate = candidate.with_meta("handler", handler);
                            if let Some(decl) = declared {
                                candidate =
                                    candidate.with_meta("handler_line", (decl + 1).to_string());
                            }
                            declared.map(|decl| signature_from(&file.lines, decl))
                        }
                        // inline closure handler
                        None if args.contains("=>") || args.contains("function") => {
                            Some(args.to_string())
                        }
                        None => None,
                    },
                };

                let (mut consumes, mut produces) = match signature {
                    Some(signature) => {
                        let (params, returns) = split_signature(&signature, file.language);
                        (payload_types(&params), payload_types(&returns))
                    }
                    None => (Vec::new(), Vec::new()),
                };
                if let Some(model) = self.response_model.captures(args) {
                    produces.extend(normalize_types(group(&model, 1).unwrap_or("")));
                }
                consumes.sort();
                consumes.dedup();
                produces.sort();
                produces.dedup();

                out.push(candidate.with_payloads(consumes, produces));
            }
        }
    }

    fn resolve_method<'a>(
        &self,
        rule: &HttpRule,
        captures: &Captures,
        raw_path: &'a str,
        args: &str,
    ) -> (String, &'a str) {
        if let Some(method) = captures.name("method") {
            return (method.as_str().to_uppercase(), raw_path);
        }
        if rule.name == "flask" {
            let method = self
                .flask_methods
                .captures(args)
                .and_then(|c| group(&c, 1).map(str::to_uppercase))
                .unwrap_or_else(|| "GET".to_string());
            return (method, raw_path);
        }
        // Go 1.22 mux patterns carry the method: "GET /users/{id}"
        if let Some((method, path)) = raw_path.split_once(' ') {
            if !method.is_empty() && method.chars().all(|c| c.is_ascii_uppercase()) {
                return (method.to_string(), path.trim_start());
            }
        }
        (rule.fixed_method.unwrap_or("ANY").to_string(), raw_path)
    }

    fn detect_grpc(&self, file: &FileText, out: &mut Vec<Candidate>) {
        for captures in self.grpc_service.captures_iter(file.content) {
            let Some(name) = captures.name("name") else {
                continue;
            };
            let line = file.line_index(name.start());
            let end = file.block_end(line, self.max_lines);
            let body = file.slice(line, end);

            let mut rpcs = Vec::new();
            let mut consumes = Vec::new();
            let mut produces = Vec::new();
            for rpc in self.grpc_rpc.captures_iter(&body) {
                rpcs.push(group(&rpc, 1).unwrap_or("").to_string());
                consumes.extend(group(&rpc, 2).map(last_segment).map(str::to_string));
                produces.extend(group(&rpc, 3).map(last_segment).map(str::to_string));
            }
            consumes.sort();
            consumes.dedup();
            produces.sort();
            produces.dedup();

            let mut candidate = Candidate::new(ComponentKind::Transport, name.as_str(), file, line)
                .with_meta(DETECTION_KEY, "grpc_service")
                .with_end(end)
                .with_payloads(consumes, produces);
            if !rpcs.is_empty() {
                candidate = candidate.with_meta("rpcs", rpcs.join(","));
            }
            candidate.transport_protocol = Some(TransportProtocol::Grpc);
            out.push(candidate);
        }
    }

    fn detect_graphql_sdl(&self, file: &FileText, out: &mut Vec<Candidate>) {
        for captures in self.sdl_root.captures_iter(file.content) {
            let Some(root) = captures.name("root") else {
                continue;
            };
            let line = file.line_index(root.start());
            let end = file.block_end(line, self.max_lines);

            for index in line + 1..end.min(file.lines.len()) {
                let Some(field) = self.sdl_field.captures(file.lines[index]) else {
                    continue;
                };
                let Some(name) = group(&field, 1) else {
                    continue;
                };
                let consumes = field.name("args").map(|a| payload_types(a.as_str())).unwrap_or_default();
                let produces = field.name("returns").map(|r| payload_types(r.as_str())).unwrap_or_default();

                let mut candidate = Candidate::new(
                    ComponentKind::Transport,
                    format!("{}.{}", root.as_str(), name),
                    file,
                    index,
                )
                .with_meta(DETECTION_KEY, "graphql_sdl")
                .with_meta("operation", root.as_str().to_lowercase())
                .with_end(index)
                .with_payloads(consumes, produces);
                candidate.transport_protocol = Some(TransportProtocol::Graphql);
                out.push(candidate);
            }
        }
    }

    fn detect_graphql_code_first(&self, file: &FileText, out: &mut Vec<Candidate>) {
        for captures in self.code_first_operation.captures_iter(file.content) {
            let Some(root) = captures.name("root") else {
                continue;
            };
            let line = file.line_index(root.start());
            let header = header_after(&file.lines, line + 1);
            let Some(method) = file
                .lines
                .get(header)
                .and_then(|l| self.method_name.captures(l))
                .and_then(|c| group(&c, 1).map(str::to_string))
            else {
                continue;
            };

            let signature = signature_from(&file.lines, header);
            let (params, returns) = split_signature(&signature, file.language);

            let mut candidate = Candidate::new(
                ComponentKind::Transport,
                format!("{}.{}", root.as_str(), method),
                file,
                line,
            )
            .with_meta(DETECTION_KEY, "graphql_resolver")
            .with_meta("operation", root.as_str().to_lowercase())
            .with_end(file.block_end(line, self.max_lines))
            .with_payloads(payload_types(&params), payload_types(&returns));
            candidate.transport_protocol = Some(TransportProtocol::Graphql);
            out.push(candidate);
        }
    }

    fn detect_keyed(&self, file: &FileText, out: &mut Vec<Candidate>) {
        for rule in self.keyed.iter().filter(|r| r.languages.contains(&file.language)) {
            for captures in rule.pattern.captures_iter(file.content) {
                let (Some(whole), Some(key)) = (captures.get(0), captures.name("key")) else {
                    continue;
                };
                let line = file.line_index(whole.start());
                let mut candidate = Candidate::new(
                    ComponentKind::Transport,
                    format!("{}{}", rule.tag, key.as_str()),
                    file,
                    line,
                )
                .with_meta(DETECTION_KEY, rule.name)
                .with_end(file.block_end(line, self.max_lines));

                if rule.protocol == TransportProtocol::Mq {
                    candidate = candidate.with_meta("topic", key.as_str());
                }
                if let Some(broker) = rule.broker {
                    candidate = candidate.with_meta("broker", broker);
                }
                candidate.transport_protocol = Some(rule.protocol);
                out.push(candidate);
            }
        }
    }
}

impl ComponentDetector for TransportDetector {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Transport
    }

    fn detect(&self, file: &FileText) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        match file.language {
            Protobuf => self.detect_grpc(file, &mut candidates),
            GraphQl => self.detect_graphql_sdl(file, &mut candidates),
            _ => {
                self.detect_http(file, &mut candidates);
                if matches!(file.language, TypeScript | JavaScript | Java | Kotlin) {
                    self.detect_graphql_code_first(file, &mut candidates);
                }
                self.detect_keyed(file, &mut candidates);
            }
        }
        candidates
    }
}

/// Join a controller prefix and a route path into one `/`-rooted path
fn join_path(prefix: &str, path: &str) -> String {
    let joined: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", joined.join("/"))
}

/// The handler named by the last identifier argument of a registration
/// call, e.g. `, auth, usersController.list)` gives `list`
fn handler_argument(args: &str) -> Option<String> {
    let mut depth = 0;
    let mut call_args = String::new();
    for ch in args.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => break,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        call_args.push(ch);
    }

    let last = call_args.split(',').map(str::trim).filter(|a| !a.is_empty()).last()?;
    let name = last_segment(last.trim_end_matches(';'));
    is_identifier(name).then(|| name.to_string())
}

/// `pkg.v1.User` and `handlers::list` both end in their last segment
fn last_segment(path: &str) -> &str {
    path.rsplit(['.', ':']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn detect(path: &str, language: Language, src: &str) -> Vec<Candidate> {
        let detector = TransportDetector::new(400).unwrap();
        detector.detect(&FileText::new(path, language, src))
    }

    fn names(found: &[Candidate]) -> Vec<&str> {
        found.iter().map(|c| c.name.as_str()).collect()
    }

    fn meta<'a>(candidate: &'a Candidate, key: &str) -> Option<&'a str> {
        candidate.metadata.get(key).map(String::as_str)
    }

    #[test]
    fn test_express_routes_with_named_handler() {
        let src = indoc! {r#"
            const router = express.Router();
            router.get("/users", auth, listUsers);
            router.post('/users', async (req, res) => {
              res.status(201).end();
            });

            function listUsers(req, res) {
              res.json(findUsers());
            }
        "#};
        let found = detect("src/routes/users.js", JavaScript, src);
        assert_eq!(names(&found), vec!["GET /users", "POST /users"]);

        let get = &found[0];
        assert_eq!(get.http_method.as_deref(), Some("GET"));
        assert_eq!(get.http_path.as_deref(), Some("/users"));
        assert_eq!(get.transport_protocol, Some(TransportProtocol::Http));
        assert_eq!(meta(get, "handler"), Some("listUsers"));
        assert_eq!(meta(get, "handler_line"), Some("7"));
        assert_eq!(get.line_start, Some(2));
        assert_eq!(get.line_end, Some(2));

        assert_eq!(meta(&found[1], "handler"), None);
        assert_eq!(found[1].line_end, Some(5));
    }

    #[test]
    fn test_nest_controller_prefix() {
        let src = indoc! {r#"
            @Controller('users')
            export class UsersController {
              @Get()
              findAll(): Promise<UserDto[]> {
                return this.users.findAll();
              }

              @Post(':id/avatar')
              upload(@Body() body: UploadAvatar) {}
            }
        "#};
        let found = detect("src/users/users.controller.ts", TypeScript, src);
        assert_eq!(names(&found), vec!["GET /users", "POST /users/:id/avatar"]);
        assert_eq!(found[0].produces, Some(vec!["UserDto".to_string()]));
        assert_eq!(found[1].consumes, Some(vec!["UploadAvatar".to_string()]));
        assert_eq!(found[0].line_end, Some(6));
    }

    #[test]
    fn test_spring_mapping_prefix() {
        let src = indoc! {r#"
            @RestController
            @RequestMapping("/api/orders")
            public class OrderController {
                @GetMapping("/{id}")
                public OrderDto get(@PathVariable String id) {
                    return service.get(id);
                }

                @PostMapping
                public OrderDto create(@RequestBody NewOrder order) {
                    return service.create(order);
                }
            }
        "#};
        let found = detect("OrderController.java", Java, src);
        assert_eq!(names(&found), vec!["GET /api/orders/{id}", "POST /api/orders"]);
        assert_eq!(found[1].consumes, Some(vec!["NewOrder".to_string()]));
        assert_eq!(found[1].produces, Some(vec!["OrderDto".to_string()]));
    }

    #[test]
    fn test_non_ascii_method_name() {
        let src = indoc! {r#"
            @RestController
            public class ProfileController {
                @GetMapping("/cv")
                public User getRésumé() {
                    return service.current();
                }
            }
        "#};
        let found = detect("ProfileController.java", Java, src);
        assert_eq!(names(&found), vec!["GET /cv"]);
        assert_eq!(found[0].produces, Some(vec!["User".to_string()]));
    }

    #[test]
    fn test_fastapi_payloads() {
        let src = indoc! {r#"
            @router.post("/messages", response_model=schemas.Message)
            async def create_message(body: schemas.MessageCreate, db: Session = Depends(get_db)):
                return crud.create(db, body)

            @app.route("/health", methods=["POST", "GET"])
            def health():
                return "ok"
        "#};
        let found = detect("app/api/messages.py", Python, src);
        assert_eq!(names(&found), vec!["POST /messages", "POST /health"]);
        assert_eq!(found[0].consumes, Some(vec!["MessageCreate".to_string()]));
        assert_eq!(found[0].produces, Some(vec!["Message".to_string()]));
        assert_eq!(found[0].line_end, Some(3));
    }

    #[test]
    fn test_go_routes() {
        let src = indoc! {r#"
            func Register(r *gin.Engine, h *Handler) {
                r.GET("/users/:id", h.GetUser)
                http.HandleFunc("/healthz", healthz)
                mux.HandleFunc("DELETE /users/{id}", h.Delete)
            }
        "#};
        let found = detect("cmd/server/routes.go", Go, src);
        assert_eq!(
            names(&found),
            vec!["GET /users/:id", "ANY /healthz", "DELETE /users/{id}"]
        );
        assert_eq!(meta(&found[0], "handler"), Some("GetUser"));
    }

    #[test]
    fn test_rust_routes() {
        let src = indoc! {r#"
            pub fn app() -> Router {
                Router::new().route("/orders", post(handlers::create_order))
            }

            #[get("/health")]
            async fn health() -> impl Responder {
                HttpResponse::Ok()
            }
        "#};
        let found = detect("src/main.rs", Rust, src);
        assert_eq!(names(&found), vec!["POST /orders", "GET /health"]);
        assert_eq!(meta(&found[0], "handler"), Some("create_order"));
    }

    #[test]
    fn test_aspnet_and_rails() {
        let cs = indoc! {r#"
            [ApiController]
            [Route("api/users")]
            public class UsersController : ControllerBase
            {
                [HttpGet("{id}")]
                public ActionResult<UserDto> Get(int id) { return Ok(); }
            }
        "#};
        let found = detect("UsersController.cs", CSharp, cs);
        assert_eq!(names(&found), vec!["GET /api/users/{id}"]);
        assert_eq!(found[0].produces, Some(vec!["UserDto".to_string()]));

        let rb = "get '/status' do\n  'ok'\nend\n";
        let found = detect("app.rb", Ruby, rb);
        assert_eq!(names(&found), vec!["GET /status"]);
        assert_eq!(found[0].line_end, Some(3));
    }

    #[test]
    fn test_grpc_service() {
        let src = indoc! {r#"
            service UserService {
              rpc GetUser (GetUserRequest) returns (User);
              rpc ListUsers (stream ListUsersRequest) returns (stream acme.v1.User);
            }
        "#};
        let found = detect("api/user.proto", Protobuf, src);
        assert_eq!(names(&found), vec!["UserService"]);
        let service = &found[0];
        assert_eq!(service.transport_protocol, Some(TransportProtocol::Grpc));
        assert_eq!(meta(service, "rpcs"), Some("GetUser,ListUsers"));
        assert_eq!(
            service.consumes,
            Some(vec!["GetUserRequest".to_string(), "ListUsersRequest".to_string()])
        );
        assert_eq!(service.produces, Some(vec!["User".to_string()]));
    }

    #[test]
    fn test_graphql_operations() {
        let sdl = indoc! {r#"
            type Query {
              users(filter: UserFilter): [User!]!
              me: User
            }
            type User { id: ID! }
        "#};
        let found = detect("schema.graphql", GraphQl, sdl);
        assert_eq!(names(&found), vec!["Query.users", "Query.me"]);
        assert_eq!(found[0].consumes, Some(vec!["UserFilter".to_string()]));
        assert_eq!(found[0].produces, Some(vec!["User".to_string()]));
        assert_eq!(meta(&found[0], "operation"), Some("query"));

        let resolver = indoc! {r#"
            @Resolver(() => Recipe)
            export class RecipeResolver {
              @Mutation(() => Recipe)
              async addRecipe(@Args('input') input: NewRecipeInput): Promise<Recipe> {
                return this.recipes.create(input);
              }
            }
        "#};
        let found = detect("src/recipes/recipe.resolver.ts", TypeScript, resolver);
        assert_eq!(names(&found), vec!["Mutation.addRecipe"]);
        assert_eq!(found[0].consumes, Some(vec!["NewRecipeInput".to_string()]));
    }

    #[test]
    fn test_socket_queue_and_event_handlers() {
        let src = indoc! {r#"
            io.on('connection', (socket) => {
              socket.on("chat:message", handleMessage);
            });

            @WebSocketGateway()
            export class ChatGateway {
              @SubscribeMessage('typing')
              onTyping() {}
            }

            @EventPattern('order.created')
            handleOrder() {}

            await consumer.subscribe({ topic: 'payments', fromBeginning: true });

            @OnEvent('user.registered')
            sendWelcome() {}
        "#};
        let found = detect("src/realtime.ts", TypeScript, src);
        assert_eq!(
            names(&found),
            vec![
                "ws:connection",
                "ws:chat:message",
                "ws:typing",
                "ws:ChatGateway",
                "mq:order.created",
                "mq:payments",
                "event:user.registered",
            ]
        );

        let payments = found.iter().find(|c| c.name == "mq:payments").unwrap();
        assert_eq!(payments.transport_protocol, Some(TransportProtocol::Mq));
        assert_eq!(meta(payments, "topic"), Some("payments"));
        assert_eq!(meta(payments, "broker"), Some("kafka"));

        let event = found.iter().find(|c| c.name == "event:user.registered").unwrap();
        assert_eq!(event.transport_protocol, Some(TransportProtocol::Unknown));
    }

    #[test]
    fn test_jvm_listeners() {
        let src = indoc! {r#"
            @KafkaListener(topics = "invoices", groupId = "billing")
            public void onInvoice(InvoiceEvent event) {}
        "#};
        let found = detect("InvoiceListener.java", Java, src);
        assert_eq!(names(&found), vec!["mq:invoices"]);
    }

    #[test]
    fn test_handler_argument() {
        assert_eq!(handler_argument(", listUsers);"), Some("listUsers".to_string()));
        assert_eq!(handler_argument(", auth, ctrl.list)"), Some("list".to_string()));
        assert_eq!(handler_argument(", (req, res) => res.end())"), None);
        assert_eq!(handler_argument(")"), None);
        assert_eq!(handler_argument(", to: 'users#index'"), None);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "/users"), "/users");
        assert_eq!(join_path("users", ""), "/users");
        assert_eq!(join_path("/api/", "/v1//items/"), "/api/v1/items");
        assert_eq!(join_path("", ""), "/");
    }
}
