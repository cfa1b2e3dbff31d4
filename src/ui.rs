use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use health_panel::validation::validate_input;
use health_panel::{
    Dashboard, Habits, HealthInput, IdGenerator, Record, RecordFeed, RecordListener, RiskLevel,
    Sex, StoreError, ValidationError, YesNo,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType,
        Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use std::io;
use std::sync::{Arc, Mutex};

const ACCENT: Color = Color::Cyan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Register,
    Analysis,
    Records,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Register => Page::Analysis,
            Page::Analysis => Page::Records,
            Page::Records => Page::Register,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Register => Page::Records,
            Page::Analysis => Page::Register,
            Page::Records => Page::Analysis,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Register => "Registrar",
            Page::Analysis => "Análise",
            Page::Records => "Registros",
        }
    }
}

// ============================================================================
// FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Age,
    Sex,
    Weight,
    Height,
    Diabetes,
    Hypertension,
    Habits,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Age,
        Field::Sex,
        Field::Weight,
        Field::Height,
        Field::Diabetes,
        Field::Hypertension,
        Field::Habits,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Age => "Idade (anos)",
            Field::Sex => "Sexo",
            Field::Weight => "Peso (kg)",
            Field::Height => "Altura (m)",
            Field::Diabetes => "Diabetes",
            Field::Hypertension => "Hipertensão",
            Field::Habits => "Hábitos",
        }
    }

    /// Wire name, matches the keys validation reports.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Age => "idade",
            Field::Sex => "sexo",
            Field::Weight => "peso",
            Field::Height => "altura",
            Field::Diabetes => "diabetes",
            Field::Hypertension => "hipertensao",
            Field::Habits => "habitos",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Field::Age | Field::Weight | Field::Height)
    }
}

fn cycle<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
    let pos = options.iter().position(|o| *o == current).unwrap_or(0);
    let len = options.len();
    let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
    options[next]
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub selected: usize,
    pub sex: Sex,
    pub age: String,
    pub weight: String,
    pub height: String,
    pub diabetes: YesNo,
    pub hypertension: YesNo,
    pub habits: Habits,
    pub errors: Vec<ValidationError>,
}

impl Default for FormState {
    fn default() -> Self {
        let defaults = HealthInput::default();
        FormState {
            selected: 0,
            sex: defaults.sex,
            age: defaults.age.to_string(),
            weight: defaults.weight.to_string(),
            height: defaults.height.to_string(),
            diabetes: defaults.diabetes,
            hypertension: defaults.hypertension,
            habits: defaults.habits,
            errors: Vec::new(),
        }
    }
}

impl FormState {
    pub fn reset(&mut self) {
        *self = FormState::default();
    }

    pub fn field(&self) -> Field {
        Field::ALL[self.selected]
    }

    pub fn next_field(&mut self) {
        self.selected = (self.selected + 1) % Field::ALL.len();
    }

    pub fn previous_field(&mut self) {
        self.selected = (self.selected + Field::ALL.len() - 1) % Field::ALL.len();
    }

    /// Left/Right on a choice field.
    pub fn cycle_choice(&mut self, forward: bool) {
        match self.field() {
            Field::Sex => self.sex = cycle(&Sex::ALL, self.sex, forward),
            Field::Diabetes => self.diabetes = cycle(&YesNo::ALL, self.diabetes, forward),
            Field::Hypertension => {
                self.hypertension = cycle(&YesNo::ALL, self.hypertension, forward)
            }
            Field::Habits => self.habits = cycle(&Habits::ALL, self.habits, forward),
            _ => {}
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field() {
            Field::Age => Some(&mut self.age),
            Field::Weight => Some(&mut self.weight),
            Field::Height => Some(&mut self.height),
            _ => None,
        }
    }

    pub fn push_char(&mut self, c: char) {
        let allow_decimal = self.field() != Field::Age;
        if let Some(text) = self.text_mut() {
            let is_separator = c == '.' || c == ',';
            if c.is_ascii_digit() || (allow_decimal && is_separator && !text.contains(['.', ','])) {
                text.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.text_mut() {
            text.pop();
        }
    }

    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Age => self.age.clone(),
            Field::Sex => self.sex.to_string(),
            Field::Weight => self.weight.clone(),
            Field::Height => self.height.clone(),
            Field::Diabetes => self.diabetes.to_string(),
            Field::Hypertension => self.hypertension.to_string(),
            Field::Habits => self.habits.to_string(),
        }
    }

    pub fn error_for(&self, field: Field) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.field == field.key())
    }

    /// Parse and validate the form.
    pub fn to_input(&self) -> Result<HealthInput, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let age = parse_number::<u32>(&self.age, Field::Age, &mut errors);
        let weight = parse_number::<f64>(&self.weight, Field::Weight, &mut errors);
        let height = parse_number::<f64>(&self.height, Field::Height, &mut errors);

        let (Some(age), Some(weight), Some(height)) = (age, weight, height) else {
            return Err(errors);
        };

        let input = HealthInput {
            sex: self.sex,
            age,
            weight,
            height,
            diabetes: self.diabetes,
            hypertension: self.hypertension,
            habits: self.habits,
        };

        validate_input(&input).map(|_| input)
    }
}

fn parse_number<T: std::str::FromStr>(
    text: &str,
    field: Field,
    errors: &mut Vec<ValidationError>,
) -> Option<T> {
    let text = text.trim().replace(',', ".");
    if text.is_empty() {
        errors.push(ValidationError::required(field.key()));
        return None;
    }
    match text.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(ValidationError::new(field.key(), "Must be a number"));
            None
        }
    }
}

// ============================================================================
// SNAPSHOT (feed listener)
// ============================================================================

/// Latest collection pushed by the feed.
#[derive(Default)]
pub struct Snapshot {
    records: Mutex<Vec<Record>>,
    last_error: Mutex<Option<String>>,
}

impl Snapshot {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn take_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|mut e| e.take())
    }
}

impl RecordListener for Snapshot {
    fn on_update(&self, records: &[Record]) {
        if let Ok(mut current) = self.records.lock() {
            *current = records.to_vec();
        }
    }

    fn on_error(&self, error: &StoreError) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }
    }
}

// ============================================================================
// APP
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Saved(Record),
    Failed(String),
}

pub struct App {
    pub current_page: Page,
    pub form: FormState,
    pub snapshot: Arc<Snapshot>,
    pub records_state: TableState,
    pub status: Option<Status>,
    ids: IdGenerator,
}

impl App {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        App {
            current_page: Page::Register,
            form: FormState::default(),
            snapshot,
            records_state: TableState::default(),
            status: None,
            ids: IdGenerator::new(),
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// "Salvar": validate, build the record, store it through the feed.
    pub fn submit(&mut self, feed: &RecordFeed) {
        let input = match self.form.to_input() {
            Ok(input) => input,
            Err(errors) => {
                self.form.errors = errors;
                self.status = None;
                return;
            }
        };

        let record = Record::new(self.ids.next_id(), &input);
        match feed.submit(&record) {
            Ok(_) => {
                self.form.reset();
                self.status = Some(Status::Saved(record));
            }
            Err(e) => self.status = Some(Status::Failed(e.to_string())),
        }
    }

    pub fn scroll(&mut self, down: bool) {
        let len = self.snapshot.records().len();
        if len == 0 {
            self.records_state.select(None);
            return;
        }
        let i = match self.records_state.selected() {
            Some(i) if down => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        self.records_state.select(Some(i));
    }
}

pub fn run_ui(feed: &RecordFeed) -> Result<()> {
    let snapshot = Arc::new(Snapshot::default());
    // Listening for as long as the UI is up
    let subscription = feed.subscribe(snapshot.clone());
    let mut app = App::new(snapshot);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, &mut app, feed);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    subscription.unsubscribe();

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    feed: &RecordFeed,
) -> io::Result<()> {
    loop {
        if let Some(error) = app.snapshot.take_error() {
            app.status = Some(Status::Failed(error));
        }

        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc => return Ok(()),
            KeyCode::Char('q') if !app.form.field().is_numeric() || app.current_page != Page::Register => {
                return Ok(())
            }
            KeyCode::Tab => app.next_page(),
            KeyCode::BackTab => app.previous_page(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => feed.refresh(),
            _ => match app.current_page {
                Page::Register => match key.code {
                    KeyCode::Down => app.form.next_field(),
                    KeyCode::Up => app.form.previous_field(),
                    KeyCode::Left => app.form.cycle_choice(false),
                    KeyCode::Right => app.form.cycle_choice(true),
                    KeyCode::Backspace => app.form.backspace(),
                    KeyCode::Enter => app.submit(feed),
                    KeyCode::Char('c') => {
                        app.form.reset();
                        app.status = None;
                    }
                    KeyCode::Char(c) => app.form.push_char(c),
                    _ => {}
                },
                Page::Records => match key.code {
                    KeyCode::Down | KeyCode::Char('j') => app.scroll(true),
                    KeyCode::Up | KeyCode::Char('k') => app.scroll(false),
                    _ => {}
                },
                Page::Analysis => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    let records = app.snapshot.records();

    render_header(f, chunks[0], app, records.len());

    match app.current_page {
        Page::Register => render_form(f, chunks[1], app),
        Page::Analysis => render_analysis(f, chunks[1], &Dashboard::from_records(&records)),
        Page::Records => render_records(f, chunks[1], app, &records),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, total: usize) {
    let mut tab_spans = vec![Span::styled(
        "Painel de Saúde IMC  ",
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )];

    for (i, page) in [Page::Register, Page::Analysis, Page::Records].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total de Registros: {}", total),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(ACCENT)));

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let mut lines = vec![
        Line::from(Span::styled(
            "  Insira os Dados de Saúde",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (i, field) in Field::ALL.iter().enumerate() {
        let selected = i == form.selected;
        let marker = if selected { "→ " } else { "  " };
        let value = if field.is_numeric() {
            format!("{}{}", form.value(*field), if selected { "▏" } else { "" })
        } else {
            format!("◀ {} ▶", form.value(*field))
        };

        let label_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        let mut spans = vec![
            Span::styled(format!("  {}{:<14}", marker, field.label()), label_style),
            Span::styled(value, Style::default().fg(Color::White)),
        ];

        if let Some(error) = form.error_for(*field) {
            spans.push(Span::styled(
                format!("   {}", error.message),
                Style::default().fg(Color::Red),
            ));
        }

        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    match &app.status {
        Some(Status::Saved(record)) => lines.push(Line::from(Span::styled(
            format!(
                "  ✓ Dados salvos com sucesso! IMC {:.2} ({}) · risco {}",
                record.bmi, record.category, record.risk
            ),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))),
        Some(Status::Failed(message)) => lines.push(Line::from(Span::styled(
            format!("  ✗ Erro ao salvar: {}", message),
            Style::default().fg(Color::Red),
        ))),
        None => {}
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Registrar "),
    );

    f.render_widget(paragraph, area);
}

fn risk_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::High => Color::Red,
        RiskLevel::Moderate => Color::Yellow,
        RiskLevel::Low => Color::Green,
    }
}

fn render_analysis(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    if dashboard.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Nenhum dado encontrado. Por favor, registre algumas entradas na aba \"Registrar\".",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Análise de Dados de Saúde "));
        f.render_widget(empty, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    // IMC médio por gênero (bars carry hundredths so the height keeps precision)
    let bmi_bars: Vec<Bar> = dashboard
        .imc_by_sexo
        .iter()
        .map(|g| {
            Bar::default()
                .label(Line::from(g.sexo.as_str()))
                .value((g.avg_imc * 100.0).round() as u64)
                .text_value(format!("{:.2}", g.avg_imc))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();
    let bmi_chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" IMC Médio por Gênero "))
        .data(BarGroup::default().bars(&bmi_bars))
        .bar_width(10)
        .bar_gap(3);
    f.render_widget(bmi_chart, top[0]);

    // Distribuição de risco
    let risk_total = dashboard.total.max(1) as f64;
    let risk_bars: Vec<Bar> = dashboard
        .risk_distribution
        .iter()
        .map(|slice| {
            let percent = slice.value as f64 / risk_total * 100.0;
            Bar::default()
                .label(Line::from(slice.name.as_str()))
                .value(slice.value as u64)
                .text_value(format!("{} ({:.0}%)", slice.value, percent))
                .style(Style::default().fg(risk_color(slice.name)))
        })
        .collect();
    let risk_chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Distribuição de Risco "))
        .data(BarGroup::default().bars(&risk_bars))
        .bar_width(10)
        .bar_gap(3);
    f.render_widget(risk_chart, top[1]);

    render_scatter(f, rows[1], dashboard);
}

fn render_scatter(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let to_xy = |points: &[health_panel::ScatterPoint]| -> Vec<(f64, f64)> {
        points.iter().map(|p| (p.idade as f64, p.imc)).collect()
    };
    let without = to_xy(&dashboard.age_imc.sem_diabetes);
    let with = to_xy(&dashboard.age_imc.com_diabetes);

    let max_bmi = without
        .iter()
        .chain(with.iter())
        .map(|(_, bmi)| *bmi)
        .fold(40.0_f64, f64::max)
        .ceil();

    let datasets = vec![
        Dataset::default()
            .name("Sem diabetes")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Green))
            .data(&without),
        Dataset::default()
            .name("Com diabetes")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&with),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Dispersão: Idade x IMC (com Diabetes) "),
        )
        .x_axis(
            Axis::default()
                .title("Idade (anos)")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, 120.0])
                .labels(vec![Span::raw("0"), Span::raw("60"), Span::raw("120")]),
        )
        .y_axis(
            Axis::default()
                .title("IMC (kg/m²)")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_bmi])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", max_bmi / 2.0)),
                    Span::raw(format!("{:.0}", max_bmi)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_records(f: &mut Frame, area: Rect, app: &mut App, records: &[Record]) {
    let header_cells = ["Sexo", "Idade", "Peso", "Altura", "IMC", "Categoria", "Risco"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = records.iter().map(|r| {
        let color = risk_color(r.risk);
        Row::new(vec![
            Cell::from(r.sex.as_str()),
            Cell::from(r.age.to_string()),
            Cell::from(format!("{:.1}", r.weight)),
            Cell::from(format!("{:.2}", r.height)),
            Cell::from(format!("{:.2}", r.bmi)),
            Cell::from(r.category.as_str()),
            Cell::from(r.risk.as_str()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(16),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Registros (mais recentes primeiro) "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.records_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut spans = vec![key(" Tab"), Span::raw(" Página | ")];
    match app.current_page {
        Page::Register => {
            spans.extend([
                key("↑/↓"),
                Span::raw(" Campo | "),
                key("←/→"),
                Span::raw(" Opção | "),
                key("Enter"),
                Span::raw(" Salvar | "),
                key("c"),
                Span::raw(" Limpar | "),
            ]);
        }
        Page::Records => spans.extend([key("↑/↓"), Span::raw(" Navegar | ")]),
        Page::Analysis => {}
    }
    spans.extend([
        key("Ctrl+R"),
        Span::raw(" Atualizar | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Sair"),
    ]);

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
