use super::{OutputRow, PageContext, DELETE_MARKER};
use crate::rows::COLUMN_TITLES;

fn json_for_script_tag(value: &str) -> String {
    value.replace("</", "<\\/")
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_table_body(rows: &[OutputRow]) -> String {
    let mut out = String::new();
    for r in rows {
        let id = r.id.as_deref().unwrap_or_default();
        out.push_str(&format!(
            "              <tr data-id=\"{}\" class=\"hover:bg-slate-50 cursor-pointer\">\n",
            escape_html(id)
        ));
        for cell in r.cells.iter() {
            out.push_str(&format!(
                "                <td class=\"px-4 py-3 text-sm break-all\">{}</td>\n",
                escape_html(cell)
            ));
        }
        if id.is_empty() {
            out.push_str("                <td class=\"px-4 py-3\"></td>\n");
        } else {
            out.push_str(&format!(
                "                <td class=\"delete px-4 py-3 text-rose-600 font-bold text-center\">{DELETE_MARKER}</td>\n"
            ));
        }
        out.push_str("              </tr>\n");
    }
    out
}

fn render_table_head() -> String {
    let mut out = String::new();
    for title in COLUMN_TITLES.iter() {
        out.push_str(&format!(
            "                <th class=\"px-4 py-3 text-[11px] uppercase tracking-widest\">{}</th>\n",
            escape_html(title)
        ));
    }
    out.push_str("                <th class=\"px-4 py-3 text-[11px] uppercase tracking-widest\">del</th>\n");
    out
}

/// The `index_view` page: the rendered rows plus one delegated click
/// listener on the container that opens the detail page or deletes and
/// re-runs the search in place.
pub fn render_index_view(rows: &[OutputRow], ctx: &PageContext) -> Vec<u8> {
    let conf = serde_json::to_string(ctx).unwrap_or_else(|_| "{}".to_string());
    let conf = json_for_script_tag(&conf);
    let head = render_table_head();
    let body = render_table_body(rows);
    let database = escape_html(&ctx.database);
    let count = rows.len();

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>dserve admin - {database}</title>
  <script src="https://cdn.tailwindcss.com?plugins=forms"></script>
</head>
<body class="bg-slate-50 text-slate-900 min-h-screen">
  <script type="application/json" id="page-config">{conf}</script>
  <header class="flex items-center justify-between border-b border-slate-200 bg-white px-8 py-4">
    <h2 class="text-xl font-bold uppercase tracking-tight">Database {database}</h2>
    <button class="change-filter rounded-xl bg-slate-100 px-4 py-2 text-xs font-bold" type="button">FILTER</button>
  </header>

  <main class="max-w-[1440px] mx-auto w-full px-8 py-10">
    <p id="row-count" class="text-sm text-slate-500 font-bold mb-4">{count} ROWS</p>
    <div class="main-container bg-white border border-slate-200 rounded-2xl overflow-x-auto shadow-sm">
      <table class="w-full text-left border-collapse">
        <thead>
          <tr class="bg-slate-50 border-b border-slate-200">
{head}          </tr>
        </thead>
        <tbody id="table-body" class="divide-y divide-slate-100">
{body}        </tbody>
      </table>
    </div>
  </main>

  <dialog id="filter_modal" class="rounded-2xl p-6 shadow-xl">
    <form class="filter-form grid grid-cols-2 gap-3" method="dialog">
      <label class="text-xs font-bold">FIELD <input name="fld" class="w-full rounded-lg"/></label>
      <label class="text-xs font-bold">COMPARE
        <select name="compare" class="w-full rounded-lg">
          <option value=""></option>
          <option>equal</option><option>not_equal</option><option>lessthan</option>
          <option>greater</option><option>ltequal</option><option>gtequal</option>
        </select>
      </label>
      <label class="text-xs font-bold">TYPE
        <select name="type" class="w-full rounded-lg">
          <option value=""></option>
          <option>null</option><option>int</option><option>record</option>
          <option>double</option><option>str</option><option>char</option>
        </select>
      </label>
      <label class="text-xs font-bold">VALUE <input name="value" class="w-full rounded-lg"/></label>
      <label class="text-xs font-bold">FROM <input name="from" class="w-full rounded-lg"/></label>
      <label class="text-xs font-bold">COUNT <input name="count" class="w-full rounded-lg"/></label>
      <div class="col-span-2 flex justify-end gap-2">
        <button value="cancel" class="rounded-lg px-4 py-2 text-xs font-bold">CANCEL</button>
        <button value="apply" class="filtering rounded-lg bg-slate-900 text-white px-4 py-2 text-xs font-bold">APPLY</button>
      </div>
    </form>
  </dialog>

  <script>
    (function() {{
      const conf = JSON.parse(document.getElementById('page-config').textContent || '{{}}');
      const container = document.querySelector('.main-container');
      const tableBody = document.getElementById('table-body');
      const rowCount = document.getElementById('row-count');
      const modal = document.getElementById('filter_modal');
      const form = document.querySelector('.filter-form');
      let filter = conf.filter || '';

      function escapeHtml(value) {{
        return String(value)
          .replaceAll('&', '&amp;')
          .replaceAll('<', '&lt;')
          .replaceAll('>', '&gt;')
          .replaceAll('"', '&quot;')
          .replaceAll("'", '&#39;');
      }}

      function stripEmpty(params) {{
        return params.split('&').filter(function(p) {{
          if (!p) return false;
          const i = p.indexOf('=');
          return i < 0 || i < p.length - 1;
        }}).join('&');
      }}

      function apiUrl(op, extra) {{
        const url = new URL(conf.url, window.location.href);
        url.searchParams.append('db', conf.database);
        url.searchParams.append('op', op);
        let href = url.toString();
        if (extra) href += '&' + extra;
        return href;
      }}

      function isError(data) {{
        if (Array.isArray(data)) return typeof data[0] === 'string';
        return !!(data && typeof data === 'object' && data.error);
      }}

      function display(v) {{
        if (v === null || v === undefined) return '';
        if (typeof v === 'object') return JSON.stringify(v);
        return String(v);
      }}

      function toRow(rec) {{
        const fields = Array.isArray(rec) ? rec : (rec && typeof rec === 'object' ? Object.values(rec) : [rec]);
        const cells = [];
        for (let j = 0; j < 7; j++) cells.push(display(fields[j]));
        cells[6] = (fields[6] === null || fields[6] === undefined) ? '' : '...';
        const id = (typeof fields[0] === 'number' || typeof fields[0] === 'string') ? String(fields[0]).trim() : '';
        return {{ id: id, cells: cells }};
      }}

      function render(rows) {{
        const out = [];
        for (const r of rows) {{
          const cells = r.cells.map(c => `<td class="px-4 py-3 text-sm break-all">${{escapeHtml(c)}}</td>`).join('');
          const del = r.id ? '<td class="delete px-4 py-3 text-rose-600 font-bold text-center">{DELETE_MARKER}</td>' : '<td class="px-4 py-3"></td>';
          out.push(`<tr data-id="${{escapeHtml(r.id)}}" class="hover:bg-slate-50 cursor-pointer">${{cells}}${{del}}</tr>`);
        }}
        tableBody.innerHTML = out.join('');
        rowCount.textContent = `${{rows.length}} ROWS`;
      }}

      function refresh() {{
        fetch(apiUrl('search', stripEmpty('showid=yes&' + filter)))
          .then(r => r.ok ? r.json() : Promise.reject(r.status))
          .then(function(data) {{
            if (isError(data)) {{ render([]); return; }}
            const recs = Array.isArray(data) ? data : Object.values(data || {{}});
            render(recs.map(toRow));
          }})
          .catch(function(e) {{ console.warn('search failed', e); }});
      }}

      container.addEventListener('click', function(e) {{
        const cell = e.target.closest('td');
        if (!cell || !container.contains(cell)) return;
        const id = cell.parentElement.getAttribute('data-id');
        if (!id) return;
        if (cell.classList.contains('delete')) {{
          fetch(apiUrl('delete', 'recids=' + encodeURIComponent(id)))
            .then(r => r.ok ? r.json() : Promise.reject(r.status))
            .then(refresh)
            .catch(function(e) {{ console.warn('delete failed', e); }});
        }} else {{
          const sep = conf.detail_page.indexOf('?') < 0 ? '?' : '&';
          window.location.href = conf.detail_page + sep + 'op=search&showid=yes&recids=' + encodeURIComponent(id);
        }}
      }});

      document.querySelector('.change-filter').addEventListener('click', function() {{ modal.showModal(); }});
      modal.addEventListener('close', function() {{
        if (modal.returnValue !== 'apply') return;
        filter = stripEmpty(new URLSearchParams(new FormData(form)).toString());
        refresh();
      }});
    }})();
  </script>
</body>
</html>"####,
    );

    html.into_bytes()
}
